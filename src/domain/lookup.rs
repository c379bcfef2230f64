use serde::{Deserialize, Serialize};

use super::common::{Displayable, Keyed};

/// `{Id, Title}` projection of a lookup column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRef {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Title")]
    pub title: String,
}

impl LookupRef {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

impl Keyed for LookupRef {
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Displayable for LookupRef {
    fn display_label(&self) -> String {
        self.title.clone()
    }
}

/// One row of the CDOA to DSM mapping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupPair {
    #[serde(rename = "CDOA")]
    pub cdoa: LookupRef,
    #[serde(rename = "DSM")]
    pub dsm: LookupRef,
}

impl LookupPair {
    pub fn new(cdoa: LookupRef, dsm: LookupRef) -> Self {
        Self { cdoa, dsm }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_list_item_shape() {
        let raw = r#"{"CDOA":{"Id":7,"Title":"Ann Lee"},"DSM":{"Id":3,"Title":"Bo Chan"},"Id":99}"#;
        let pair: LookupPair = serde_json::from_str(raw).unwrap();
        assert_eq!(pair.cdoa, LookupRef::new(7, "Ann Lee"));
        assert_eq!(pair.dsm.title, "Bo Chan");
        assert_eq!(pair.cdoa.key(), "7");
    }
}
