//! Fault injection.
//!
//! Primes each switch with its max-load threshold and pre-fault baseline,
//! applies the lock policy, then raises the active load at the fault bus
//! and records the resulting post-fault currents.

use log::info;

use super::FlisrSession;
use crate::config::LockPolicy;
use crate::error::FlisrError;
use crate::grid::BusId;
use crate::solver::ElectricalSolver;

/// Over-current threshold margin above the rounded max-load current (kA)
const THRESHOLD_MARGIN_KA: f64 = 0.01;

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

impl<S: ElectricalSolver> FlisrSession<S> {
    /// Inject a fault at `bus`. On error the loads and switch table are left
    /// as they were before the call.
    pub fn set_fault(
        &mut self,
        bus: BusId,
        max_load_factor: f64,
        pre_fault_load_factor: f64,
    ) -> Result<(), FlisrError> {
        if !self.grid.has_load(bus) {
            return Err(FlisrError::InvalidFaultBus(bus));
        }
        info!(
            "Injecting fault at bus {} (max load {}, pre-fault load {}, fault load {} MW)",
            bus, max_load_factor, pre_fault_load_factor, self.fault_load_mw
        );

        let loads = self.grid.loads.clone();
        let switches = self.switches.clone();
        if let Err(e) = self.prime_fault(bus, max_load_factor, pre_fault_load_factor) {
            self.grid.loads = loads;
            self.switches = switches;
            return Err(e);
        }

        self.fault_bus = Some(bus);
        let tripping = self
            .switches
            .values()
            .filter(|agent| agent.measurements.over_current)
            .count();
        info!("Fault at bus {} puts {} switch(es) in over-current", bus, tripping);
        Ok(())
    }

    fn prime_fault(
        &mut self,
        bus: BusId,
        max_load_factor: f64,
        pre_fault_load_factor: f64,
    ) -> Result<(), FlisrError> {
        self.grid.set_all_loads(max_load_factor, max_load_factor / 10.0);
        let solution = self.solve("max-load baseline")?;
        for agent in self.switches.values_mut() {
            agent.measurements.current_max =
                round_to_hundredths(solution.line_current(agent.line)) + THRESHOLD_MARGIN_KA;
        }

        self.grid.set_all_loads(pre_fault_load_factor, pre_fault_load_factor / 10.0);
        let solution = self.solve("pre-fault baseline")?;
        for agent in self.switches.values_mut() {
            agent.measurements.current_pre = solution.line_current(agent.line);
        }
        self.refresh_measurements(&solution);

        if self.lock_policy == LockPolicy::EnergizedOpen {
            for agent in self.switches.values_mut() {
                let m = &agent.measurements;
                if m.v_from > 0.0 && m.v_to > 0.0 && !agent.closed() {
                    agent.lock();
                    info!("Switch {} locked open between two energized sections", agent.name);
                }
            }
        }

        for agent in self.switches.values_mut() {
            let m = &mut agent.measurements;
            m.current_remaining = m.current_max - m.current_pre;
        }
        self.refresh_measurements(&solution);

        self.grid.set_bus_active_load(bus, self.fault_load_mw);
        let solution = self.solve("fault")?;
        for agent in self.switches.values_mut() {
            agent.measurements.current_post = solution.line_current(agent.line);
        }
        self.refresh_measurements(&solution);
        Ok(())
    }
}
