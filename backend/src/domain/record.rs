//! Attribute record model and write-side validation.
//!
//! A record ties one characteristic text (merkmal, auspraegung, drucktext and
//! their qualifiers) to an owning identnr. Records read back from the store
//! are trusted as-is; anything written goes through [`RecordDraft`] first so
//! field limits hold for every row created by this service.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum length of an identnr.
pub const IDENTNR_MAX_LEN: usize = 50;
/// Maximum length of a merkmal.
pub const MERKMAL_MAX_LEN: usize = 100;
/// Maximum length of an auspraegung.
pub const AUSPRAEGUNG_MAX_LEN: usize = 100;
/// Maximum length of a drucktext.
pub const DRUCKTEXT_MAX_LEN: usize = 255;
/// Maximum length of a sondermerkmal.
pub const SONDERMERKMAL_MAX_LEN: usize = 100;
/// Highest special department code; `0` means "none".
pub const SONDER_ABT_MAX: i32 = 7;

/// System-assigned record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i32);

impl RecordId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validation failure for a single field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// A required text field is absent or blank.
    #[error("{field} is required")]
    Required { field: &'static str },
    /// A text field exceeds its length limit.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    /// A numeric field is outside its permitted range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },
}

impl FieldError {
    /// Name of the offending field as it appears on the wire.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field }
            | Self::TooLong { field, .. }
            | Self::OutOfRange { field, .. } => field,
        }
    }
}

/// Every field failure found while validating one draft.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Individual failures in field order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// One message per failure.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// True when no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// A validated owner identifier.
///
/// Trimmed, non-empty and at most [`IDENTNR_MAX_LEN`] characters.
///
/// # Examples
/// ```
/// use merkmal_backend::domain::Identnr;
///
/// let identnr = Identnr::new("  4711-A ").expect("valid identnr");
/// assert_eq!(identnr.as_str(), "4711-A");
/// assert!(Identnr::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identnr(String);

impl Identnr {
    /// Validate and construct an identnr.
    pub fn new(value: impl AsRef<str>) -> Result<Self, FieldError> {
        required_text("identnr", value.as_ref(), IDENTNR_MAX_LEN).map(Self)
    }

    /// Borrow the identnr text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identnr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identnr {
    type Error = FieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identnr> for String {
    fn from(value: Identnr) -> Self {
        value.0
    }
}

/// Every field of a record except its id and owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFields {
    /// Characteristic name.
    pub merkmal: String,
    /// Characteristic value.
    pub auspraegung: String,
    /// Print text.
    pub drucktext: String,
    /// Optional special characteristic; `None`, `""` and blanks are equivalent.
    pub sondermerkmal: Option<String>,
    /// Ordering position, shared by every row of one group.
    pub position: i32,
    /// Special department code in `0..=7`.
    pub sonder_abt: i32,
    /// Production list flag; `None` and `0` are equivalent.
    pub fertigungsliste: Option<i32>,
}

/// A persisted attribute record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// Immutable system-assigned id.
    pub id: RecordId,
    /// Owning identnr.
    pub identnr: String,
    /// Descriptive fields.
    pub fields: AttributeFields,
}

/// A validated record ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Owning identnr.
    pub identnr: Identnr,
    /// Descriptive fields.
    pub fields: AttributeFields,
}

impl NewRecord {
    /// Copy `fields` under a different owner.
    #[must_use]
    pub fn for_owner(identnr: Identnr, fields: AttributeFields) -> Self {
        Self { identnr, fields }
    }

    /// Human-readable rendering of the uniqueness tuple.
    #[must_use]
    pub fn identity_label(&self) -> String {
        format!(
            "identnr '{}', merkmal '{}', auspraegung '{}', drucktext '{}'",
            self.identnr, self.fields.merkmal, self.fields.auspraegung, self.fields.drucktext
        )
    }
}

/// Raw, unvalidated record input.
///
/// Used for creates, full replacements and, with [`RecordDraft::overlay`],
/// partial updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDraft {
    /// Owning identnr.
    pub identnr: Option<String>,
    /// Characteristic name.
    pub merkmal: Option<String>,
    /// Characteristic value.
    pub auspraegung: Option<String>,
    /// Print text.
    pub drucktext: Option<String>,
    /// Special characteristic.
    pub sondermerkmal: Option<String>,
    /// Ordering position.
    pub position: Option<i64>,
    /// Special department code.
    pub sonder_abt: Option<i64>,
    /// Production list flag.
    pub fertigungsliste: Option<i64>,
}

impl RecordDraft {
    /// Draft mirroring an existing record.
    #[must_use]
    pub fn from_record(record: &AttributeRecord) -> Self {
        let fields = &record.fields;
        Self {
            identnr: Some(record.identnr.clone()),
            merkmal: Some(fields.merkmal.clone()),
            auspraegung: Some(fields.auspraegung.clone()),
            drucktext: Some(fields.drucktext.clone()),
            sondermerkmal: fields.sondermerkmal.clone(),
            position: Some(i64::from(fields.position)),
            sonder_abt: Some(i64::from(fields.sonder_abt)),
            fertigungsliste: fields.fertigungsliste.map(i64::from),
        }
    }

    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill every unset field of `self` from `base`.
    #[must_use]
    pub fn overlay(self, base: Self) -> Self {
        Self {
            identnr: self.identnr.or(base.identnr),
            merkmal: self.merkmal.or(base.merkmal),
            auspraegung: self.auspraegung.or(base.auspraegung),
            drucktext: self.drucktext.or(base.drucktext),
            sondermerkmal: self.sondermerkmal.or(base.sondermerkmal),
            position: self.position.or(base.position),
            sonder_abt: self.sonder_abt.or(base.sonder_abt),
            fertigungsliste: self.fertigungsliste.or(base.fertigungsliste),
        }
    }

    /// Validate every field including the owner.
    ///
    /// # Examples
    /// ```
    /// use merkmal_backend::domain::RecordDraft;
    ///
    /// let draft = RecordDraft {
    ///     identnr: Some("4711".into()),
    ///     merkmal: Some("Farbe".into()),
    ///     auspraegung: Some("rot".into()),
    ///     drucktext: Some("Farbe: rot".into()),
    ///     ..RecordDraft::default()
    /// };
    /// let record = draft.validate().expect("valid draft");
    /// assert_eq!(record.fields.position, 0);
    /// assert_eq!(record.fields.fertigungsliste, Some(0));
    /// ```
    pub fn validate(&self) -> Result<NewRecord, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let identnr = collect(
            &mut errors,
            Identnr::new(self.identnr.as_deref().unwrap_or_default()),
        );
        let fields = self.check_fields(&mut errors);
        match (identnr, fields) {
            (Some(identnr), Some(fields)) if errors.is_empty() => Ok(NewRecord { identnr, fields }),
            _ => Err(errors),
        }
    }

    /// Validate the descriptive fields, ignoring the owner.
    pub fn validate_fields(&self) -> Result<AttributeFields, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let fields = self.check_fields(&mut errors);
        match fields {
            Some(fields) if errors.is_empty() => Ok(fields),
            _ => Err(errors),
        }
    }

    fn check_fields(&self, errors: &mut ValidationErrors) -> Option<AttributeFields> {
        let merkmal = collect(errors, required("merkmal", &self.merkmal, MERKMAL_MAX_LEN));
        let auspraegung = collect(
            errors,
            required("auspraegung", &self.auspraegung, AUSPRAEGUNG_MAX_LEN),
        );
        let drucktext = collect(
            errors,
            required("drucktext", &self.drucktext, DRUCKTEXT_MAX_LEN),
        );
        let sondermerkmal = collect(
            errors,
            optional_text(
                "sondermerkmal",
                self.sondermerkmal.as_deref(),
                SONDERMERKMAL_MAX_LEN,
            ),
        );
        let position = collect(
            errors,
            bounded("position", self.position.unwrap_or(0), 0, i64::from(i32::MAX)),
        );
        let sonder_abt = collect(
            errors,
            bounded(
                "sonderAbt",
                self.sonder_abt.unwrap_or(0),
                0,
                i64::from(SONDER_ABT_MAX),
            ),
        );
        let fertigungsliste = collect(
            errors,
            bounded("fertigungsliste", self.fertigungsliste.unwrap_or(0), 0, 1),
        );
        Some(AttributeFields {
            merkmal: merkmal?,
            auspraegung: auspraegung?,
            drucktext: drucktext?,
            sondermerkmal: Some(sondermerkmal?),
            position: position?,
            sonder_abt: sonder_abt?,
            fertigungsliste: Some(fertigungsliste?),
        })
    }
}

fn collect<T>(errors: &mut ValidationErrors, result: Result<T, FieldError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            errors.push(error);
            None
        }
    }
}

fn required(field: &'static str, value: &Option<String>, max: usize) -> Result<String, FieldError> {
    required_text(field, value.as_deref().unwrap_or_default(), max)
}

fn required_text(field: &'static str, value: &str, max: usize) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Required { field });
    }
    if trimmed.chars().count() > max {
        return Err(FieldError::TooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

fn optional_text(field: &'static str, value: Option<&str>, max: usize) -> Result<String, FieldError> {
    let trimmed = value.unwrap_or_default().trim();
    if trimmed.chars().count() > max {
        return Err(FieldError::TooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

fn bounded(field: &'static str, value: i64, min: i64, max: i64) -> Result<i32, FieldError> {
    if !(min..=max).contains(&value) {
        return Err(FieldError::OutOfRange { field, min, max });
    }
    i32::try_from(value).map_err(|_| FieldError::OutOfRange { field, min, max })
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
