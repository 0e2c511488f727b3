use thiserror::Error;

use super::data::{NewTestCase, Status, Team};

/// Why a submission was refused. The message is shown to the user as is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Please fill in both the Test Case ID and the Description.")]
    MissingFields,

    #[error("Test Case ID must be a number.")]
    NotANumber,
}

/// State of the "add test case" form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationForm {
    pub test_case_id: String,
    pub description: String,
    /// Team toggle: on = "Quotation to Pricing"
    pub quotation_to_pricing: bool,
}

impl CreationForm {
    pub fn team(&self) -> Team {
        if self.quotation_to_pricing {
            Team::QuotationToPricing
        } else {
            Team::PricingToQuotation
        }
    }

    /// Validate the form and build the insert payload
    pub fn submit(&self) -> Result<NewTestCase, FormError> {
        let id_raw = self.test_case_id.trim();
        let description = self.description.trim();
        if id_raw.is_empty() || description.is_empty() {
            return Err(FormError::MissingFields);
        }
        let test_case_id: i64 = id_raw.parse().map_err(|_| FormError::NotANumber)?;

        Ok(NewTestCase {
            test_case_id,
            team: self.team(),
            description: description.to_string(),
            status: Status::New,
        })
    }

    /// Empty the text fields after a successful insert; the team toggle stays
    pub fn clear(&mut self) {
        self.test_case_id.clear();
        self.description.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(id: &str, description: &str) -> CreationForm {
        CreationForm {
            test_case_id: id.into(),
            description: description.into(),
            quotation_to_pricing: false,
        }
    }

    #[test]
    fn test_rejects_empty_fields() {
        assert_eq!(form("", "x").submit(), Err(FormError::MissingFields));
        assert_eq!(form("42", "   ").submit(), Err(FormError::MissingFields));
    }

    #[test]
    fn test_rejects_non_numeric_id() {
        assert_eq!(form("abc", "x").submit(), Err(FormError::NotANumber));
        assert_eq!(form("42abc", "x").submit(), Err(FormError::NotANumber));
        assert_eq!(form("4.2", "x").submit(), Err(FormError::NotANumber));
    }

    #[test]
    fn test_accepts_trimmed_input() {
        let mut f = form(" 42 ", "  check totals \n");
        f.quotation_to_pricing = true;
        let new = f.submit().unwrap();
        assert_eq!(new.test_case_id, 42);
        assert_eq!(new.description, "check totals");
        assert_eq!(new.status, Status::New);
        assert_eq!(new.team, Team::QuotationToPricing);
    }

    #[test]
    fn test_clear_keeps_team() {
        let mut f = form("1", "d");
        f.quotation_to_pricing = true;
        f.clear();
        assert!(f.test_case_id.is_empty());
        assert!(f.description.is_empty());
        assert_eq!(f.team(), Team::QuotationToPricing);
    }
}
