//! Typed column references for the inventory read views.

use chrono::NaiveDate;
use fleetdesk_query::{FieldRef, Schema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientField {
    Id,
    Name,
}

pub struct ClientSchema;

impl Schema for ClientSchema {
    type Field = ClientField;

    fn field_name(field: Self::Field) -> &'static str {
        match field {
            ClientField::Id => "id",
            ClientField::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseField {
    Id,
    Name,
    ClientId,
    Status,
    ExpiryDate,
}

pub struct LicenseSchema;

impl Schema for LicenseSchema {
    type Field = LicenseField;

    fn field_name(field: Self::Field) -> &'static str {
        match field {
            LicenseField::Id => "id",
            LicenseField::Name => "name",
            LicenseField::ClientId => "client_id",
            LicenseField::Status => "status",
            LicenseField::ExpiryDate => "expiry_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipmentField {
    Id,
    Name,
    ClientId,
    Status,
    Type,
    EndOfLifeDate,
}

pub struct EquipmentSchema;

impl Schema for EquipmentSchema {
    type Field = EquipmentField;

    fn field_name(field: Self::Field) -> &'static str {
        match field {
            EquipmentField::Id => "id",
            EquipmentField::Name => "name",
            EquipmentField::ClientId => "client_id",
            EquipmentField::Status => "status",
            EquipmentField::Type => "type",
            EquipmentField::EndOfLifeDate => "end_of_life_date",
        }
    }
}

pub mod client {
    use super::{ClientField, ClientSchema, FieldRef, Uuid};

    pub const ID: FieldRef<ClientSchema, Uuid> = FieldRef::new(ClientField::Id);
    pub const NAME: FieldRef<ClientSchema, String> = FieldRef::new(ClientField::Name);
}

pub mod license {
    use super::{FieldRef, LicenseField, LicenseSchema, NaiveDate, Uuid};

    pub const ID: FieldRef<LicenseSchema, Uuid> = FieldRef::new(LicenseField::Id);
    pub const NAME: FieldRef<LicenseSchema, String> = FieldRef::new(LicenseField::Name);
    pub const CLIENT_ID: FieldRef<LicenseSchema, Uuid> = FieldRef::new(LicenseField::ClientId);
    pub const STATUS: FieldRef<LicenseSchema, String> = FieldRef::new(LicenseField::Status);
    pub const EXPIRY_DATE: FieldRef<LicenseSchema, NaiveDate> =
        FieldRef::new(LicenseField::ExpiryDate);
}

pub mod equipment {
    use super::{EquipmentField, EquipmentSchema, FieldRef, NaiveDate, Uuid};

    pub const ID: FieldRef<EquipmentSchema, Uuid> = FieldRef::new(EquipmentField::Id);
    pub const NAME: FieldRef<EquipmentSchema, String> = FieldRef::new(EquipmentField::Name);
    pub const CLIENT_ID: FieldRef<EquipmentSchema, Uuid> =
        FieldRef::new(EquipmentField::ClientId);
    pub const STATUS: FieldRef<EquipmentSchema, String> = FieldRef::new(EquipmentField::Status);
    pub const TYPE: FieldRef<EquipmentSchema, String> = FieldRef::new(EquipmentField::Type);
    pub const END_OF_LIFE_DATE: FieldRef<EquipmentSchema, NaiveDate> =
        FieldRef::new(EquipmentField::EndOfLifeDate);
}
