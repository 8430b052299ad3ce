//! Text codecs for moving stacks out of the store.

pub mod export;
pub mod share;

pub use export::{
    DRAFT_ID_PREFIX, FORMAT_VERSION, StackDocument, decode_document, encode_document,
    encode_stack, encode_working_set,
};
pub use share::{
    SHARE_PAYLOAD_VERSION, ShareLink, SharedStack, decode_share_token, decode_share_url,
    generate_share_url,
};
