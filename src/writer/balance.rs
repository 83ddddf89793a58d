//! Power balance constraints.
//!
//! On a single busbar every resource feeds the same node, so there is one row per scenario. With
//! several busbars each (bus, scenario) pair gets its own row and lines move power between them.
use crate::network::Network;
use crate::optimisation::{LinearExpr, OptimisationModel};
use crate::resource::Resource;
use anyhow::Result;

/// Prefix of the single-busbar balance rows
pub const POWER_BALANCE: &str = "power_balance";

/// Prefix of the per-bus balance rows
pub const BUS_BALANCE: &str = "bus_balance";

/// Add `Σ active_power = 0` for every scenario, summing over all active resources
pub fn add_power_balance(
    model: &mut OptimisationModel,
    network: &Network,
    num_scenarios: usize,
) -> Result<()> {
    for scene in 0..num_scenarios {
        let mut power = LinearExpr::zero();
        for (_, resource) in network.active_elements() {
            power += resource.active_power(scene)?;
        }
        model.add_equality(format!("{POWER_BALANCE}[{scene}]"), power, 0.0)?;
    }

    Ok(())
}

/// Add a balance row for every (bus, scenario) pair.
///
/// Resources contribute their active power at the bus they are connected to. A line's transmitted
/// power is added at its `from` bus and subtracted at its `to` bus; its own active power is not
/// counted, so the flow enters each balance exactly once.
pub fn add_bus_balance(
    model: &mut OptimisationModel,
    network: &Network,
    num_scenarios: usize,
) -> Result<()> {
    for scene in 0..num_scenarios {
        let mut power = vec![LinearExpr::zero(); network.buses.len()];
        for (element, resource) in network.active_elements() {
            power[element.bus] += resource.active_power(scene)?;
        }
        for (line, resource) in network.active_lines() {
            if let Some(flow) = resource.transmitted_power(scene)? {
                power[line.from_bus] += flow.clone();
                power[line.to_bus] -= flow;
            }
        }

        for (bus, power) in power.into_iter().enumerate() {
            model.add_equality(format!("{BUS_BALANCE}[{bus},{scene}]"), power, 0.0)?;
        }
    }

    Ok(())
}
