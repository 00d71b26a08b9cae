//! Concrete DLP request/response pairs built on the schema tables in
//! [`crate::field`]. Each type only supplies its command ID, its argument
//! schemas, and small glue converting to/from [`FieldValue`] lists — the
//! actual wire walking lives entirely in [`crate::codec`] and
//! [`crate::field`].

use crate::codec::{DlpRequest, DlpResponse};
use crate::error::DlpResult;
use crate::field::{Field, FieldType, FieldValue};

fn no_args(values: Vec<Vec<FieldValue>>) -> DlpResult<()> {
    debug_assert!(values.is_empty());
    Ok(())
}

// ---- ReadSysInfo --------------------------------------------------------

pub struct ReadSysInfoRequest;

impl DlpRequest for ReadSysInfoRequest {
    const COMMAND_ID: u8 = 0x12;
    fn argument_schemas(&self) -> &'static [&'static [Field]] {
        &[]
    }
    fn to_argument_values(&self) -> Vec<Vec<FieldValue>> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSysInfoResponse {
    pub rom_version: u32,
    pub locale: u32,
    pub product_id: String,
}

const READ_SYS_INFO_SCHEMA: &[Field] = &[
    Field {
        name: "rom_version",
        ty: FieldType::U32,
    },
    Field {
        name: "locale",
        ty: FieldType::U32,
    },
    Field {
        name: "product_id",
        ty: FieldType::PString,
    },
];

impl DlpResponse for ReadSysInfoResponse {
    const COMMAND_ID: u8 = 0x12;
    fn argument_schemas() -> &'static [&'static [Field]] {
        &[READ_SYS_INFO_SCHEMA]
    }
    fn from_argument_values(mut values: Vec<Vec<FieldValue>>) -> DlpResult<Self> {
        let arg = values.remove(0);
        Ok(Self {
            rom_version: arg[0].as_u32()?,
            locale: arg[1].as_u32()?,
            product_id: arg[2].as_str()?.to_string(),
        })
    }
}

// ---- ReadUserInfo --------------------------------------------------------

pub struct ReadUserInfoRequest;

impl DlpRequest for ReadUserInfoRequest {
    const COMMAND_ID: u8 = 0x10;
    fn argument_schemas(&self) -> &'static [&'static [Field]] {
        &[]
    }
    fn to_argument_values(&self) -> Vec<Vec<FieldValue>> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadUserInfoResponse {
    pub user_id: u32,
    pub viewer_id: u32,
    pub last_sync_pc: u32,
    pub username: String,
}

const READ_USER_INFO_SCHEMA: &[Field] = &[
    Field {
        name: "user_id",
        ty: FieldType::U32,
    },
    Field {
        name: "viewer_id",
        ty: FieldType::U32,
    },
    Field {
        name: "last_sync_pc",
        ty: FieldType::U32,
    },
    Field {
        name: "username",
        ty: FieldType::CString,
    },
];

impl DlpResponse for ReadUserInfoResponse {
    const COMMAND_ID: u8 = 0x10;
    fn argument_schemas() -> &'static [&'static [Field]] {
        &[READ_USER_INFO_SCHEMA]
    }
    fn from_argument_values(mut values: Vec<Vec<FieldValue>>) -> DlpResult<Self> {
        let arg = values.remove(0);
        Ok(Self {
            user_id: arg[0].as_u32()?,
            viewer_id: arg[1].as_u32()?,
            last_sync_pc: arg[2].as_u32()?,
            username: arg[3].as_str()?.to_string(),
        })
    }
}

// ---- OpenDB ---------------------------------------------------------------

pub struct OpenDbRequest {
    pub mode: u8,
    pub name: String,
}

const OPEN_DB_REQUEST_SCHEMA: &[Field] = &[
    Field {
        name: "card_id",
        ty: FieldType::U8,
    },
    Field {
        name: "mode",
        ty: FieldType::U8,
    },
    Field {
        name: "name",
        ty: FieldType::CString,
    },
];

impl DlpRequest for OpenDbRequest {
    const COMMAND_ID: u8 = 0x17;
    fn argument_schemas(&self) -> &'static [&'static [Field]] {
        &[OPEN_DB_REQUEST_SCHEMA]
    }
    fn to_argument_values(&self) -> Vec<Vec<FieldValue>> {
        vec![vec![
            FieldValue::U8(0),
            FieldValue::U8(self.mode),
            FieldValue::Str(self.name.clone()),
        ]]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDbResponse {
    pub handle: u8,
}

const OPEN_DB_RESPONSE_SCHEMA: &[Field] = &[Field {
    name: "handle",
    ty: FieldType::U8,
}];

impl DlpResponse for OpenDbResponse {
    const COMMAND_ID: u8 = 0x17;
    fn argument_schemas() -> &'static [&'static [Field]] {
        &[OPEN_DB_RESPONSE_SCHEMA]
    }
    fn from_argument_values(mut values: Vec<Vec<FieldValue>>) -> DlpResult<Self> {
        let arg = values.remove(0);
        Ok(Self {
            handle: arg[0].as_u8()?,
        })
    }
}

// ---- CloseDB --------------------------------------------------------------

pub struct CloseDbRequest {
    pub handle: u8,
}

const CLOSE_DB_SCHEMA: &[Field] = &[Field {
    name: "handle",
    ty: FieldType::U8,
}];

impl DlpRequest for CloseDbRequest {
    const COMMAND_ID: u8 = 0x19;
    fn argument_schemas(&self) -> &'static [&'static [Field]] {
        &[CLOSE_DB_SCHEMA]
    }
    fn to_argument_values(&self) -> Vec<Vec<FieldValue>> {
        vec![vec![FieldValue::U8(self.handle)]]
    }
}

pub struct CloseDbResponse;

impl DlpResponse for CloseDbResponse {
    const COMMAND_ID: u8 = 0x19;
    fn argument_schemas() -> &'static [&'static [Field]] {
        &[]
    }
    fn from_argument_values(values: Vec<Vec<FieldValue>>) -> DlpResult<Self> {
        no_args(values)?;
        Ok(Self)
    }
}

// ---- ReadDBList ------------------------------------------------------------

pub struct ReadDbListRequest {
    pub card_id: u8,
    pub start_index: u16,
}

const READ_DB_LIST_REQUEST_SCHEMA: &[Field] = &[
    Field {
        name: "flags",
        ty: FieldType::U8,
    },
    Field {
        name: "card_id",
        ty: FieldType::U8,
    },
    Field {
        name: "start_index",
        ty: FieldType::U16,
    },
];

impl DlpRequest for ReadDbListRequest {
    const COMMAND_ID: u8 = 0x16;
    fn argument_schemas(&self) -> &'static [&'static [Field]] {
        &[READ_DB_LIST_REQUEST_SCHEMA]
    }
    fn to_argument_values(&self) -> Vec<Vec<FieldValue>> {
        vec![vec![
            FieldValue::U8(0x80), // list multiple
            FieldValue::U8(self.card_id),
            FieldValue::U16(self.start_index),
        ]]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInfo {
    pub name: String,
    pub db_type: u32,
    pub creator: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadDbListResponse {
    pub last_index: u16,
    pub databases: Vec<DbInfo>,
}

const READ_DB_LIST_RESPONSE_SCHEMA: &[Field] = &[
    Field {
        name: "last_index",
        ty: FieldType::U16,
    },
    Field {
        name: "db_type",
        ty: FieldType::U32,
    },
    Field {
        name: "creator",
        ty: FieldType::U32,
    },
    Field {
        name: "name",
        ty: FieldType::CString,
    },
];

impl DlpResponse for ReadDbListResponse {
    const COMMAND_ID: u8 = 0x16;
    fn argument_schemas() -> &'static [&'static [Field]] {
        &[READ_DB_LIST_RESPONSE_SCHEMA]
    }
    fn from_argument_values(mut values: Vec<Vec<FieldValue>>) -> DlpResult<Self> {
        let arg = values.remove(0);
        let last_index = arg[0].as_u16()?;
        let db = DbInfo {
            db_type: arg[1].as_u32()?,
            creator: arg[2].as_u32()?,
            name: arg[3].as_str()?.to_string(),
        };
        Ok(Self {
            last_index,
            databases: vec![db],
        })
    }
}

// ---- ReadRecordByIndex ------------------------------------------------------

pub struct ReadRecordByIndexRequest {
    pub handle: u8,
    pub index: u16,
}

const READ_RECORD_BY_INDEX_SCHEMA: &[Field] = &[
    Field {
        name: "handle",
        ty: FieldType::U8,
    },
    Field {
        name: "index",
        ty: FieldType::U16,
    },
];

impl DlpRequest for ReadRecordByIndexRequest {
    const COMMAND_ID: u8 = 0x1F;
    fn argument_schemas(&self) -> &'static [&'static [Field]] {
        &[READ_RECORD_BY_INDEX_SCHEMA]
    }
    fn to_argument_values(&self) -> Vec<Vec<FieldValue>> {
        vec![vec![FieldValue::U8(self.handle), FieldValue::U16(self.index)]]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecordByIndexResponse {
    pub record_id: u32,
    pub attributes: u8,
    pub category: u8,
    pub data: Vec<u8>,
}

const READ_RECORD_BY_INDEX_RESPONSE_SCHEMA: &[Field] = &[
    Field {
        name: "record_id",
        ty: FieldType::U32,
    },
    Field {
        name: "attributes",
        ty: FieldType::U8,
    },
    Field {
        name: "category",
        ty: FieldType::U8,
    },
    Field {
        name: "data",
        ty: FieldType::TrailingBytes,
    },
];

impl DlpResponse for ReadRecordByIndexResponse {
    const COMMAND_ID: u8 = 0x1F;
    fn argument_schemas() -> &'static [&'static [Field]] {
        &[READ_RECORD_BY_INDEX_RESPONSE_SCHEMA]
    }
    fn from_argument_values(mut values: Vec<Vec<FieldValue>>) -> DlpResult<Self> {
        let arg = values.remove(0);
        Ok(Self {
            record_id: arg[0].as_u32()?,
            attributes: arg[1].as_u8()?,
            category: arg[2].as_u8()?,
            data: arg[3].as_bytes()?.to_vec(),
        })
    }
}

// ---- WriteRecord ------------------------------------------------------------

pub struct WriteRecordRequest {
    pub handle: u8,
    pub attributes: u8,
    pub category: u8,
    pub data: Vec<u8>,
}

const WRITE_RECORD_SCHEMA: &[Field] = &[
    Field {
        name: "handle",
        ty: FieldType::U8,
    },
    Field {
        name: "flags",
        ty: FieldType::U8,
    },
    Field {
        name: "record_id",
        ty: FieldType::U32,
    },
    Field {
        name: "attributes",
        ty: FieldType::U8,
    },
    Field {
        name: "category",
        ty: FieldType::U8,
    },
    Field {
        name: "data",
        ty: FieldType::TrailingBytes,
    },
];

impl DlpRequest for WriteRecordRequest {
    const COMMAND_ID: u8 = 0x21;
    fn argument_schemas(&self) -> &'static [&'static [Field]] {
        &[WRITE_RECORD_SCHEMA]
    }
    fn to_argument_values(&self) -> Vec<Vec<FieldValue>> {
        vec![vec![
            FieldValue::U8(self.handle),
            FieldValue::U8(0x80), // new record
            FieldValue::U32(0),   // device assigns the record id
            FieldValue::U8(self.attributes),
            FieldValue::U8(self.category),
            FieldValue::Bytes(self.data.clone()),
        ]]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecordResponse {
    pub record_id: u32,
}

const WRITE_RECORD_RESPONSE_SCHEMA: &[Field] = &[Field {
    name: "record_id",
    ty: FieldType::U32,
}];

impl DlpResponse for WriteRecordResponse {
    const COMMAND_ID: u8 = 0x21;
    fn argument_schemas() -> &'static [&'static [Field]] {
        &[WRITE_RECORD_RESPONSE_SCHEMA]
    }
    fn from_argument_values(mut values: Vec<Vec<FieldValue>>) -> DlpResult<Self> {
        let arg = values.remove(0);
        Ok(Self {
            record_id: arg[0].as_u32()?,
        })
    }
}

// ---- EndOfSync --------------------------------------------------------------

pub struct EndOfSyncRequest {
    pub status: u16,
}

const END_OF_SYNC_SCHEMA: &[Field] = &[Field {
    name: "status",
    ty: FieldType::U16,
}];

impl DlpRequest for EndOfSyncRequest {
    const COMMAND_ID: u8 = 0x2F;
    fn argument_schemas(&self) -> &'static [&'static [Field]] {
        &[END_OF_SYNC_SCHEMA]
    }
    fn to_argument_values(&self) -> Vec<Vec<FieldValue>> {
        vec![vec![FieldValue::U16(self.status)]]
    }
}

pub struct EndOfSyncResponse;

impl DlpResponse for EndOfSyncResponse {
    const COMMAND_ID: u8 = 0x2F;
    fn argument_schemas() -> &'static [&'static [Field]] {
        &[]
    }
    fn from_argument_values(values: Vec<Vec<FieldValue>>) -> DlpResult<Self> {
        no_args(values)?;
        Ok(Self)
    }
}
