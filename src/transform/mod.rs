//! Transformation engine
//!
//! Inbound: message to attribute map (`EntityType::attributes_from`).
//! Outbound: record to field values or a message (`EntityType::fields_from`,
//! `EntityType::to_message`).

mod attributes;
mod convert;
mod inbound;
mod nested;
mod nullify;
mod outbound;
mod transformer;

pub use attributes::{Attributes, NestedAttributes};
pub use convert::{
    ConversionKey, ConvertFn, Converter, ConverterRegistry, ConverterTable, Direction, Resolvable,
    coerce_inbound, coerce_outbound, epoch_to_date, epoch_to_timestamp, string_to_uuid, to_epoch,
    uuid_to_string,
};
pub use nullify::{NullifyList, carries_nullify_field};
pub use outbound::{FieldOptions, FieldValues};
pub use transformer::{
    AttributeTransformer, FieldTransformer, MessageFn, RecordFn, RecordTransformerRef,
    TransformerOptions, TransformerRef,
};

pub(crate) use outbound::AccessorTable;
