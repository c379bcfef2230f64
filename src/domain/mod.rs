pub mod common;
pub mod fields;
pub mod lookup;
pub mod record;

pub use common::{Displayable, Keyed};
pub use fields::{FieldName, FieldValue, FormFields, PersonSelection, RequestType};
pub use lookup::{LookupPair, LookupRef};
pub use record::SubmissionRecord;
