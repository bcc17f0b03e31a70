//! Internal Diesel row structs for the `merkmalstexte` table.
//!
//! These never leave the persistence layer; repositories convert them to and
//! from domain records.

use diesel::prelude::*;

use crate::domain::{AttributeFields, AttributeRecord, NewRecord, RecordId};

use super::schema::merkmalstexte;

/// Row read from `merkmalstexte`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = merkmalstexte)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MerkmalstextRow {
    pub id: i32,
    pub identnr: String,
    pub merkmal: String,
    pub auspraegung: String,
    pub drucktext: String,
    pub sondermerkmal: Option<String>,
    pub merkmalsposition: i32,
    pub maka: i32,
    pub fertigungsliste: Option<i32>,
}

impl From<MerkmalstextRow> for AttributeRecord {
    fn from(row: MerkmalstextRow) -> Self {
        Self {
            id: RecordId::new(row.id),
            identnr: row.identnr,
            fields: AttributeFields {
                merkmal: row.merkmal,
                auspraegung: row.auspraegung,
                drucktext: row.drucktext,
                sondermerkmal: row.sondermerkmal,
                position: row.merkmalsposition,
                sonder_abt: row.maka,
                fertigungsliste: row.fertigungsliste,
            },
        }
    }
}

/// Column values written by inserts and full updates.
///
/// `treat_none_as_null` makes an update clear optional columns instead of
/// leaving them untouched.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = merkmalstexte)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct MerkmalstextWrite<'a> {
    pub identnr: &'a str,
    pub merkmal: &'a str,
    pub auspraegung: &'a str,
    pub drucktext: &'a str,
    pub sondermerkmal: Option<&'a str>,
    pub merkmalsposition: i32,
    pub maka: i32,
    pub fertigungsliste: Option<i32>,
}

impl<'a> From<&'a NewRecord> for MerkmalstextWrite<'a> {
    fn from(record: &'a NewRecord) -> Self {
        let fields = &record.fields;
        Self {
            identnr: record.identnr.as_str(),
            merkmal: &fields.merkmal,
            auspraegung: &fields.auspraegung,
            drucktext: &fields.drucktext,
            sondermerkmal: fields.sondermerkmal.as_deref(),
            merkmalsposition: fields.position,
            maka: fields.sonder_abt,
            fertigungsliste: fields.fertigungsliste,
        }
    }
}
