use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Student identifier as used in `/grades/{student_id}` (the student's name in the dataset).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct StudentId(pub String);

impl StudentId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StudentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_id_from_string() {
        let id = StudentId::from("Ivanov Ivan".to_string());
        assert_eq!(id.to_string(), "Ivanov Ivan");
        assert_eq!(id.as_str(), "Ivanov Ivan");
    }

    #[test]
    fn student_id_serde_is_transparent() {
        let id = StudentId::from("Petrov");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Petrov\"");
        let parsed: StudentId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
