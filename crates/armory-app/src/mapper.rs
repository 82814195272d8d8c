//! Translation of submitted gun data (HTML form or JSON body) into store changes.
//!
//! Both surfaces first produce a [`GunInput`], the typed presence map of all
//! fields, and [`changes`] turns it into set/clear operations. Any optional
//! field that is not supplied with a non-empty value is cleared, so an update
//! always replaces the whole record. Image is the exception: it is only ever
//! set, a missing upload keeps the stored image.

use std::{collections::HashMap, str::FromStr};

use armory_dal::gun::{FieldValue, GunChanges, GunField};
use garde::Validate;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct GunInput {
    #[garde(length(chars, max = 255))]
    pub gun_name: String,
    #[garde(skip)]
    pub year: Option<i64>,
    #[garde(skip)]
    pub condition: Option<i64>,
    #[garde(length(chars, max = 255))]
    pub serial_number: Option<String>,
    #[garde(length(chars, max = 255))]
    pub description: Option<String>,
    #[garde(length(chars, max = 255))]
    pub misc_attachments: Option<String>,
    #[garde(skip)]
    pub value: Option<f64>,
    #[garde(skip)]
    pub image: Option<Vec<u8>>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

fn set_or_clear(changes: GunChanges, value: Option<FieldValue>, field: GunField) -> GunChanges {
    match value {
        Some(value) => changes.set(value),
        None => changes.clear(field),
    }
}

pub fn changes(input: GunInput) -> GunChanges {
    let GunInput {
        gun_name,
        year,
        condition,
        serial_number,
        description,
        misc_attachments,
        value,
        image,
    } = input;

    let mut changes = GunChanges::new(gun_name);
    changes = set_or_clear(changes, year.map(FieldValue::Year), GunField::Year);
    changes = set_or_clear(
        changes,
        condition.map(FieldValue::Condition),
        GunField::Condition,
    );
    changes = set_or_clear(
        changes,
        non_empty(serial_number).map(FieldValue::SerialNumber),
        GunField::SerialNumber,
    );
    changes = set_or_clear(
        changes,
        non_empty(description).map(FieldValue::Description),
        GunField::Description,
    );
    changes = set_or_clear(
        changes,
        non_empty(misc_attachments).map(FieldValue::MiscAttachments),
        GunField::MiscAttachments,
    );
    changes = set_or_clear(changes, value.map(FieldValue::Value), GunField::Value);
    if let Some(image) = image.filter(|i| !i.is_empty()) {
        changes = changes.set(FieldValue::Image(image));
    }
    changes
}

/// JSON body of create and update requests
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GunPayload {
    #[serde(default)]
    pub gun_name: String,
    pub year: Option<i64>,
    pub condition: Option<i64>,
    pub serial_number: Option<String>,
    pub description: Option<String>,
    pub misc_attachments: Option<String>,
    pub value: Option<f64>,
}

impl From<GunPayload> for GunInput {
    fn from(payload: GunPayload) -> Self {
        GunInput {
            gun_name: payload.gun_name,
            year: payload.year,
            condition: payload.condition,
            serial_number: payload.serial_number,
            description: payload.description,
            misc_attachments: payload.misc_attachments,
            value: payload.value,
            image: None,
        }
    }
}

/// Submitted HTML form, all values are text
#[derive(Debug, Clone, Default)]
pub struct GunForm {
    fields: HashMap<String, String>,
    image: Option<Vec<u8>>,
}

impl GunForm {
    /// Repeated field replaces earlier value, same as browsers' last-one-wins
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn set_image(&mut self, data: Vec<u8>) {
        if !data.is_empty() {
            self.image = Some(data);
        }
    }

    fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).filter(|v| !v.is_empty()).cloned()
    }

    /// Unparsable numbers are ignored
    fn number<T: FromStr>(&self, name: &str) -> Option<T> {
        self.fields.get(name).and_then(|v| v.trim().parse().ok())
    }
}

impl FromIterator<(String, String)> for GunForm {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut form = GunForm::default();
        for (name, value) in iter {
            form.add_field(name, value);
        }
        form
    }
}

impl From<GunForm> for GunInput {
    fn from(form: GunForm) -> Self {
        GunInput {
            gun_name: form.fields.get("gun_name").cloned().unwrap_or_default(),
            year: form.number("year"),
            condition: form.number("condition"),
            serial_number: form.text("serial_number"),
            description: form.text("description"),
            misc_attachments: form.text("misc_attachments"),
            value: form.number::<f64>("value").filter(|v| v.is_finite()),
            image: form.image,
        }
    }
}
