//! Plan document: data model, persistence, identifiers, and reference
//! resolution.

pub mod blocks;
pub mod ids;
pub mod refs;
pub mod store;
pub mod types;

pub use blocks::{extract_info_block, extract_summary, parse_payload, InfoBlock, Payload};
pub use ids::next_id;
pub use refs::{
    build_context, parse_ref, resolve_placeholders, resolve_ref_list, resolve_refs,
    sanitize_p_node, RefExpr, ResolvedRef,
};
pub use store::PlanStore;
pub use types::{
    CheckList, NodeResult, NodeStatus, PlanDocument, PlanNode, TaskKind, FINAL_BATCH,
};
