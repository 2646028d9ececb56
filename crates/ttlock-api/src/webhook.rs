// Webhook delivery decoding
//
// The vendor posts lock records as a form body whose `records` field is a
// JSON-encoded array. Relays sometimes re-wrap the body as JSON, with
// `records` either still a string or already an array. Individual records
// are left as raw JSON; interpreting them is the core crate's job.

use serde_json::Value;

use crate::error::Error;

/// One push delivery: a batch of raw record objects, possibly for
/// several locks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookDelivery {
    pub records: Vec<Value>,
}

impl WebhookDelivery {
    /// Wrap already-decoded records.
    pub fn from_records(records: Vec<Value>) -> Self {
        Self { records }
    }

    /// Decode an `application/x-www-form-urlencoded` body.
    pub fn from_form(body: &str) -> Result<Self, Error> {
        let records = url::form_urlencoded::parse(body.as_bytes())
            .find(|(key, _)| key == "records")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| Error::Deserialization {
                message: "form body has no `records` field".into(),
                body: body.to_owned(),
            })?;
        Self::from_records_str(&records)
    }

    /// Decode a JSON object carrying a `records` field.
    pub fn from_json(body: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.to_owned(),
        })?;
        match value.get("records") {
            Some(Value::String(encoded)) => Self::from_records_str(encoded),
            Some(Value::Array(records)) => Ok(Self::from_records(records.clone())),
            _ => Err(Error::Deserialization {
                message: "expected `records` to be an array or a JSON string".into(),
                body: body.to_owned(),
            }),
        }
    }

    /// Sniff the body: JSON if it starts with `{`, form otherwise.
    pub fn parse(body: &str) -> Result<Self, Error> {
        if body.trim_start().starts_with('{') {
            Self::from_json(body)
        } else {
            Self::from_form(body.trim())
        }
    }

    fn from_records_str(encoded: &str) -> Result<Self, Error> {
        let records: Vec<Value> =
            serde_json::from_str(encoded).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: encoded.to_owned(),
            })?;
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
