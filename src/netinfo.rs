// Endpoint extraction
// Reads each unit's port bindings back from the engine and groups the
// resulting endpoint records by service name. The engine is the source of
// truth for mappings, so bindings are re-read on every extraction.

use crate::engine::ComposeEngine;
use crate::errors::Result;
use crate::model::{NetworkInfo, Unit, UnitHandle};
use std::collections::BTreeMap;

/// Map every unit to its endpoint records, grouped by service name. Units
/// sharing a service name (scaled services) land in the same entry in
/// engine enumeration order. A unit exposing no ports contributes a handle
/// with an empty record list.
pub fn extract(
    engine: &dyn ComposeEngine,
    units: &[Unit],
) -> Result<BTreeMap<String, Vec<UnitHandle>>> {
    let mut services: BTreeMap<String, Vec<UnitHandle>> = BTreeMap::new();

    for unit in units {
        let bindings = engine.port_bindings(unit)?;
        let network_info = bindings.iter().map(NetworkInfo::from_binding).collect();
        services
            .entry(unit.service.clone())
            .or_default()
            .push(UnitHandle {
                unit: unit.clone(),
                network_info,
            });
    }

    Ok(services)
}
