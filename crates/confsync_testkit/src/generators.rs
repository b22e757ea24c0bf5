//! Property-based test generators using proptest.
//!
//! Provides strategies for paths, payloads and whole desired states.

use crate::fixtures::ResponseBuilder;
use confsync_protocol::{ConfigResponse, Path, PathSource};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for generating product names.
pub fn product_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("ASM_FEATURES".to_string()),
        Just("ASM_DD".to_string()),
        Just("ASM_DATA".to_string()),
        Just("ASM".to_string()),
        prop::string::string_regex("[A-Z][A-Z_]{0,15}").expect("Invalid regex"),
    ]
}

/// Strategy for generating valid paths.
pub fn path_strategy() -> impl Strategy<Value = Path> {
    let source = prop_oneof![
        "[0-9]{1,6}".prop_map(|org_id| PathSource::Datadog { org_id }),
        Just(PathSource::Employee),
    ];
    let segment = || prop::string::string_regex("[a-z0-9][a-z0-9_.-]{0,23}").expect("Invalid regex");

    (source, product_strategy(), segment(), segment())
        .prop_map(|(source, product, config_id, name)| Path::new(source, product, config_id, name))
}

/// Strategy for generating configuration payloads.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

/// Strategy for generating a desired state: distinct paths and their payloads.
pub fn desired_state_strategy(max: usize) -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(
        path_strategy().prop_map(|path| path.to_string()),
        payload_strategy(),
        0..=max,
    )
}

/// Builds the agent response serving `desired` at `version`.
pub fn response_for(desired: &BTreeMap<String, Vec<u8>>, version: u64) -> ConfigResponse {
    desired
        .iter()
        .fold(ResponseBuilder::new(version), |builder, (path, data)| {
            builder.config(path, data)
        })
        .build()
}
