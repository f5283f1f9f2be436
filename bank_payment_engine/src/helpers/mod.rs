mod reference;

pub use reference::{
    derive_reference,
    InvalidReferencePrefix,
    PaymentReference,
    ReferenceMatcher,
    DEFAULT_REFERENCE_PREFIX,
    REFERENCE_SUFFIX_LEN,
};
