//! Processed tax documents (read model).
//!
//! Documents are produced by the extraction pipeline elsewhere in the product; this
//! crate only reads them. `Document::parse` validates the extracted payload at the
//! boundary and turns it into a tagged `DocumentExtract`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::error::AppError;
use crate::money::Amount;

pub const PROCESSING_STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_type: Option<String>,
    pub tax_year: Option<i32>,
    pub processing_status: String,
    pub extracted_data: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// Wage statement fields
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct W2Data {
    #[serde(alias = "box1_wages", alias = "wages_tips_other_comp")]
    pub wages: Amount,
    #[serde(
        default,
        alias = "federal_tax_withheld",
        alias = "box2_federal_withholding"
    )]
    pub federal_income_tax_withheld: Amount,
    #[serde(default)]
    pub employer_name: Option<String>,
}

/// 1099-family fields
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Form1099Data {
    #[serde(
        alias = "amount",
        alias = "nonemployee_compensation",
        alias = "other_income",
        alias = "interest_income",
        alias = "ordinary_dividends"
    )]
    pub income: Amount,
    #[serde(default, alias = "federal_tax_withheld")]
    pub federal_income_tax_withheld: Amount,
    #[serde(default)]
    pub payer_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Deduction {
    pub amount: Amount,
    #[serde(default, alias = "type", alias = "category")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentExtract {
    W2(W2Data),
    /// `kind` is the full type key, e.g. `1099-nec`
    Form1099 { kind: String, data: Form1099Data },
    Other { kind: Option<String> },
}

/// A completed document decoded into typed fields
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub id: Uuid,
    pub extract: DocumentExtract,
    pub deductions: Vec<Deduction>,
    /// Untouched payload, forwarded as-is in the filing's per-document extracts
    pub raw: JsonValue,
}

fn normalize_type(raw: &str) -> String {
    raw.trim().to_lowercase().replace('_', "-")
}

fn is_w2(kind: &str) -> bool {
    kind == "w2" || kind == "w-2"
}

fn is_1099(kind: &str) -> bool {
    kind.starts_with("1099")
}

impl Document {
    pub fn is_completed(&self) -> bool {
        self.processing_status.eq_ignore_ascii_case(PROCESSING_STATUS_COMPLETED)
    }

    /// Document type from the explicit column, otherwise the form key of the
    /// extracted payload (or its only key when no form key is present).
    pub fn resolved_type(&self) -> Option<String> {
        if let Some(explicit) = self.document_type.as_deref().filter(|t| !t.trim().is_empty()) {
            return Some(normalize_type(explicit));
        }
        let obj = self.extracted_data.as_ref().and_then(JsonValue::as_object)?;
        let mut forms = form_entries(obj);
        if forms.len() == 1 {
            return forms.pop().map(|(kind, _)| kind);
        }
        if forms.is_empty() && obj.len() == 1 {
            return obj.keys().next().map(|k| normalize_type(k));
        }
        None
    }

    pub fn parse(&self) -> Result<ParsedDocument, AppError> {
        let data = self.extracted_data.as_ref().unwrap_or(&JsonValue::Null);
        let top = data.as_object();
        let forms = top.map(form_entries).unwrap_or_default();

        let ambiguous = |why: String| {
            AppError::InvalidDocumentData(format!("document {}: ambiguous payload: {}", self.id, why))
        };
        if forms.len() > 1 {
            let keys: Vec<&str> = forms.iter().map(|(k, _)| k.as_str()).collect();
            return Err(ambiguous(format!("several form keys ({})", keys.join(", "))));
        }

        let kind = self.resolved_type();
        let nested = forms.first();
        if let (Some(k), Some((form_key, _))) = (kind.as_deref(), nested) {
            let conflicting = if is_w2(k) {
                !is_w2(form_key)
            } else {
                is_1099(k) && k != form_key.as_str()
            };
            if conflicting {
                return Err(ambiguous(format!("type '{}' but payload keyed '{}'", k, form_key)));
            }
        }
        let payload = nested.map(|(_, value)| *value).unwrap_or(data);

        let invalid = |what: &str, e: serde_json::Error| {
            AppError::InvalidDocumentData(format!("document {}: invalid {} data: {}", self.id, what, e))
        };

        let extract = match kind.as_deref() {
            Some(k) if is_w2(k) => {
                DocumentExtract::W2(W2Data::deserialize(payload).map_err(|e| invalid("W-2", e))?)
            }
            Some(k) if is_1099(k) => DocumentExtract::Form1099 {
                kind: k.to_string(),
                data: Form1099Data::deserialize(payload).map_err(|e| invalid("1099", e))?,
            },
            other => DocumentExtract::Other {
                kind: other.map(str::to_string),
            },
        };

        // Deductions may sit beside the form key, inside the form object, or be the
        // whole payload of a deductions document.
        let mut sources: Vec<&JsonValue> = Vec::new();
        match data {
            JsonValue::Object(obj) => sources.extend(obj.get("deductions")),
            JsonValue::Array(_) if kind.as_deref() == Some("deductions") => sources.push(data),
            _ => {}
        }
        if let Some((_, form)) = nested {
            sources.extend(form.get("deductions"));
        }

        let mut deductions = Vec::new();
        for value in sources.into_iter().filter(|v| !v.is_null()) {
            deductions
                .extend(Vec::<Deduction>::deserialize(value).map_err(|e| invalid("deductions", e))?);
        }

        Ok(ParsedDocument {
            id: self.id,
            extract,
            deductions,
            raw: data.clone(),
        })
    }
}

/// Top-level keys naming a W-2 or 1099 form, normalized, with their values
fn form_entries(obj: &serde_json::Map<String, JsonValue>) -> Vec<(String, &JsonValue)> {
    obj.iter()
        .filter_map(|(key, value)| {
            let kind = normalize_type(key);
            (is_w2(&kind) || is_1099(&kind)).then_some((kind, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn doc(document_type: Option<&str>, data: JsonValue) -> Document {
        Document {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            document_type: document_type.map(str::to_string),
            tax_year: Some(2024),
            processing_status: "completed".to_string(),
            extracted_data: Some(data),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn infers_w2_from_top_level_key() {
        let d = doc(
            None,
            json!({"w2": {"wages": "$52,000.00", "federal_income_tax_withheld": 6100}}),
        );
        let parsed = d.parse().unwrap();
        match parsed.extract {
            DocumentExtract::W2(w2) => {
                assert_eq!(w2.wages.value(), dec!(52000.00));
                assert_eq!(w2.federal_income_tax_withheld.value(), dec!(6100));
            }
            other => panic!("unexpected extract {:?}", other),
        }
    }

    #[test]
    fn explicit_type_wins_and_flat_payload_is_accepted() {
        let d = doc(
            Some("1099-NEC"),
            json!({"nonemployee_compensation": 1200.5, "federal_tax_withheld": "0"}),
        );
        match d.parse().unwrap().extract {
            DocumentExtract::Form1099 { kind, data } => {
                assert_eq!(kind, "1099-nec");
                assert_eq!(data.income.value(), dec!(1200.5));
            }
            other => panic!("unexpected extract {:?}", other),
        }
    }

    #[test]
    fn malformed_w2_fails_closed() {
        let d = doc(None, json!({"w2": {"wages": "lots"}}));
        assert!(matches!(d.parse(), Err(AppError::InvalidDocumentData(_))));

        let missing = doc(Some("w2"), json!({"employer_name": "Acme"}));
        assert!(matches!(missing.parse(), Err(AppError::InvalidDocumentData(_))));
    }

    #[test]
    fn deductions_on_any_document() {
        let d = doc(
            Some("receipt"),
            json!({"vendor": "Clinic", "deductions": [{"amount": 250, "description": "medical"}, {"amount": "$49.50"}]}),
        );
        let parsed = d.parse().unwrap();
        assert!(matches!(parsed.extract, DocumentExtract::Other { .. }));
        let total: rust_decimal::Decimal = parsed.deductions.iter().map(|d| d.amount.value()).sum();
        assert_eq!(total, dec!(299.50));
    }

    #[test]
    fn ambiguous_payload_is_other() {
        let d = doc(None, json!({"a": 1, "b": 2}));
        assert_eq!(d.resolved_type(), None);
        assert!(matches!(
            d.parse().unwrap().extract,
            DocumentExtract::Other { kind: None }
        ));
    }

    #[test]
    fn form_key_with_sibling_deductions() {
        let d = doc(
            None,
            json!({
                "w2": {"wages": 52000, "federal_income_tax_withheld": 6100},
                "deductions": [{"amount": 500}]
            }),
        );
        assert_eq!(d.resolved_type().as_deref(), Some("w2"));
        let parsed = d.parse().unwrap();
        match parsed.extract {
            DocumentExtract::W2(w2) => assert_eq!(w2.wages.value(), dec!(52000)),
            other => panic!("unexpected extract {:?}", other),
        }
        assert_eq!(parsed.deductions.len(), 1);
        assert_eq!(parsed.deductions[0].amount.value(), dec!(500));
    }

    #[test]
    fn nested_and_top_level_deductions_both_count() {
        let d = doc(
            None,
            json!({
                "1099_int": {"interest_income": 80, "deductions": [{"amount": 20}]},
                "deductions": [{"amount": 30}]
            }),
        );
        let parsed = d.parse().unwrap();
        assert!(matches!(parsed.extract, DocumentExtract::Form1099 { ref kind, .. } if kind == "1099-int"));
        let total: rust_decimal::Decimal = parsed.deductions.iter().map(|d| d.amount.value()).sum();
        assert_eq!(total, dec!(50));
    }

    #[test]
    fn several_form_keys_fail_closed() {
        let d = doc(
            None,
            json!({"w2": {"wages": 1000}, "1099-nec": {"amount": 200}}),
        );
        assert_eq!(d.resolved_type(), None);
        assert!(matches!(d.parse(), Err(AppError::InvalidDocumentData(_))));
    }

    #[test]
    fn explicit_type_conflicting_with_form_key_fails_closed() {
        let d = doc(Some("w2"), json!({"1099-misc": {"amount": 200}}));
        assert!(matches!(d.parse(), Err(AppError::InvalidDocumentData(_))));
    }

    #[test]
    fn deductions_only_document() {
        let d = doc(None, json!({"deductions": [{"amount": 75, "type": "charity"}]}));
        let parsed = d.parse().unwrap();
        assert!(matches!(
            parsed.extract,
            DocumentExtract::Other { kind: Some(ref k) } if k == "deductions"
        ));
        assert_eq!(parsed.deductions[0].description.as_deref(), Some("charity"));
    }
}
