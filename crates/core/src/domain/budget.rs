use serde::{Deserialize, Serialize};

const FILE_PREFIX: &str = "orcamento_";
const FILE_SUFFIX: &str = ".pdf";

/// Sequential budget number, shown zero-padded to four digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BudgetNumber(pub u32);

impl BudgetNumber {
    pub fn file_name(&self) -> String {
        format!("{FILE_PREFIX}{self}{FILE_SUFFIX}")
    }

    pub fn parse_file_name(file_name: &str) -> Option<Self> {
        file_name
            .strip_prefix(FILE_PREFIX)?
            .strip_suffix(FILE_SUFFIX)?
            .parse::<u32>()
            .ok()
            .map(Self)
    }
}

impl std::fmt::Display for BudgetNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Customer fields exactly as typed on the budget, before normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl ContactSnapshot {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self { name: name.into(), phone: phone.into(), email: email.into() }
    }
}

/// A finished budget document ready to be stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub display_name: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::BudgetNumber;

    #[test]
    fn file_name_is_zero_padded() {
        assert_eq!(BudgetNumber(1).file_name(), "orcamento_0001.pdf");
        assert_eq!(BudgetNumber(12345).file_name(), "orcamento_12345.pdf");
    }

    #[test]
    fn parse_file_name_recovers_number() {
        assert_eq!(BudgetNumber::parse_file_name("orcamento_0042.pdf"), Some(BudgetNumber(42)));
        assert_eq!(BudgetNumber::parse_file_name("invoice_0042.pdf"), None);
        assert_eq!(BudgetNumber::parse_file_name("orcamento_abc.pdf"), None);
    }
}
