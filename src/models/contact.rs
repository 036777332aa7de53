use serde::{Deserialize, Serialize};

/// Where alerts for a patient are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatientContact {
    pub patient_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl PatientContact {
    #[cfg(test)]
    pub fn email_only(patient_id: &str, email: &str) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            email: Some(email.to_string()),
            phone: None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
