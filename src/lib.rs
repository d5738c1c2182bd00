#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use morph_json as json;
pub use morph_utils as utils;
