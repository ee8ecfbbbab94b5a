//! Tool group registration (spec §4.H). Each group contributes a
//! `build(&Arc<AppComponents>) -> Vec<Arc<dyn Tool>>`; the optional
//! AI-assisted group may return an empty vector without affecting
//! anything else.

mod ai_tools;
mod code_knowledge_tools;
mod firewall_tools;
mod memory_tools;
mod project_tools;
mod quality_tools;

use crate::state::AppComponents;
use std::sync::Arc;
use tracing::info;

pub fn register_all(components: &Arc<AppComponents>) {
    let groups: Vec<(&str, Vec<Arc<dyn mcp_tool::Tool>>)> = vec![
        ("memory", memory_tools::build(components)),
        ("project", project_tools::build(components)),
        ("code_knowledge", code_knowledge_tools::build(components)),
        ("quality", quality_tools::build(components)),
        ("firewall", firewall_tools::build(components)),
        ("ai", ai_tools::build(components)),
    ];

    for (group, tools) in groups {
        let count = tools.len();
        components.registry.register_group(tools);
        info!(group, count, "registered tool group");
    }

    info!(total = components.registry.len(), "tool registry populated");
}
