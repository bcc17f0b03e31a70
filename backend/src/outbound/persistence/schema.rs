//! Diesel table definitions for the PostgreSQL schema.
//!
//! Must match `backend/migrations` exactly; regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Attribute text records.
    ///
    /// `(identnr, merkmal, auspraegung, drucktext)` is unique
    /// (`merkmalstexte_identity_key`).
    merkmalstexte (id) {
        /// Serial primary key.
        id -> Int4,
        /// Owning product identifier (max 50 characters).
        identnr -> Varchar,
        /// Characteristic name (max 100 characters).
        merkmal -> Varchar,
        /// Characteristic value (max 100 characters).
        auspraegung -> Varchar,
        /// Print text (max 255 characters).
        drucktext -> Varchar,
        /// Optional special characteristic; legacy rows may hold NULL.
        sondermerkmal -> Nullable<Varchar>,
        /// Ordering position, exposed as `position`.
        merkmalsposition -> Int4,
        /// Special department code 0..=7, exposed as `sonderAbt`.
        maka -> Int4,
        /// Production list flag 0/1; legacy rows may hold NULL.
        fertigungsliste -> Nullable<Int4>,
        /// Row creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp (maintained by trigger).
        updated_at -> Timestamptz,
    }
}
