//! The network description: buses and the element tables bound to resources.
//!
//! Each element row may carry a bound [`Resource`]; rows without one are part of the network but
//! take no part in the optimisation. The rows also form the write-back surface for the sizing
//! decisions of a solved model.
use crate::resource::{Resource, TransmissionLine};
use crate::units::{Current, Dimensionless, Energy, Power, Voltage};
use anyhow::{Result, ensure};
use std::fmt;
use strum::IntoEnumIterator;

/// A node of the network
#[derive(Clone, Debug, PartialEq)]
pub struct Bus {
    /// Bus name (may be empty)
    pub name: String,
    /// Nominal voltage
    pub vn_kv: Voltage,
}

impl Bus {
    /// The bus name, or its index if it has no name
    pub fn label(&self, index: usize) -> String {
        if self.name.is_empty() {
            index.to_string()
        } else {
            self.name.clone()
        }
    }
}

/// The element tables which connect to a single bus
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ElementTable {
    /// External grid ties
    ExtGrid,
    /// Loads
    Load,
    /// Generators
    Generation,
    /// Storage units
    Storage,
}

/// A row of one of the single-bus element tables
pub struct Element {
    /// Element name
    pub name: String,
    /// Index of the bus the element connects to
    pub bus: usize,
    /// Whether the element is in service
    pub in_service: bool,
    /// Rated power
    pub pr_mw: Option<Power>,
    /// Maximum active power
    pub max_p_mw: Option<Power>,
    /// Maximum reactive power
    pub max_q_mvar: Option<f64>,
    /// Maximum stored energy
    pub max_e_mwh: Option<Energy>,
    /// The resource bound to this row
    pub resource: Option<Box<dyn Resource>>,
}

impl Element {
    /// Create an in-service element with no ratings and no resource
    pub fn new(name: &str, bus: usize) -> Self {
        Self {
            name: name.to_string(),
            bus,
            in_service: true,
            pr_mw: None,
            max_p_mw: None,
            max_q_mvar: None,
            max_e_mwh: None,
            resource: None,
        }
    }

    /// Bind a resource to this row
    pub fn with_resource(mut self, resource: impl Resource + 'static) -> Self {
        self.resource = Some(Box::new(resource));
        self
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name)
            .field("bus", &self.bus)
            .field("in_service", &self.in_service)
            .field("resource", &self.resource.as_ref().map(|r| r.name()))
            .finish_non_exhaustive()
    }
}

/// A row of the line table
#[derive(Debug)]
pub struct LineElement {
    /// Line name
    pub name: String,
    /// Index of the bus the line starts at
    pub from_bus: usize,
    /// Index of the bus the line ends at
    pub to_bus: usize,
    /// Rated current
    pub max_i_ka: Current,
    /// Whether the line is in service
    pub in_service: bool,
    /// The line resource bound to this row
    pub resource: Option<TransmissionLine>,
}

impl LineElement {
    /// Create an in-service line with no resource
    pub fn new(name: &str, from_bus: usize, to_bus: usize, max_i_ka: Current) -> Self {
        Self {
            name: name.to_string(),
            from_bus,
            to_bus,
            max_i_ka,
            in_service: true,
            resource: None,
        }
    }

    /// Power rating derived from the rated current and the nominal voltage of the `from` bus.
    ///
    /// Three-phase lines carry √3 times the single-phase power.
    pub fn rating(&self, buses: &[Bus], three_phase: bool) -> Power {
        let pr = self.max_i_ka * buses[self.from_bus].vn_kv;
        if three_phase {
            pr * Dimensionless(3f64.sqrt())
        } else {
            pr
        }
    }
}

/// The network description
#[derive(Debug, Default)]
pub struct Network {
    /// Buses, indexed by position
    pub buses: Vec<Bus>,
    /// External grid ties
    pub ext_grid: Vec<Element>,
    /// Loads
    pub load: Vec<Element>,
    /// Generators
    pub generation: Vec<Element>,
    /// Storage units
    pub storage: Vec<Element>,
    /// Lines
    pub line: Vec<LineElement>,
}

impl Network {
    /// Add a bus, returning its index
    pub fn add_bus(&mut self, name: &str, vn_kv: Voltage) -> usize {
        self.buses.push(Bus {
            name: name.to_string(),
            vn_kv,
        });
        self.buses.len() - 1
    }

    /// Add an element to one of the single-bus tables
    pub fn add_element(&mut self, table: ElementTable, element: Element) -> Result<()> {
        self.check_bus(element.bus, &element.name)?;
        self.table_mut(table).push(element);
        Ok(())
    }

    /// Add a line
    pub fn add_line(&mut self, line: LineElement) -> Result<()> {
        self.check_bus(line.from_bus, &line.name)?;
        self.check_bus(line.to_bus, &line.name)?;
        self.line.push(line);
        Ok(())
    }

    /// Check that a bus index exists
    pub fn check_bus(&self, bus: usize, element: &str) -> Result<()> {
        ensure!(
            bus < self.buses.len(),
            "Element {element} refers to unknown bus {bus}"
        );
        Ok(())
    }

    /// One of the single-bus tables
    pub fn table(&self, table: ElementTable) -> &[Element] {
        match table {
            ElementTable::ExtGrid => &self.ext_grid,
            ElementTable::Load => &self.load,
            ElementTable::Generation => &self.generation,
            ElementTable::Storage => &self.storage,
        }
    }

    /// One of the single-bus tables, mutably
    pub fn table_mut(&mut self, table: ElementTable) -> &mut Vec<Element> {
        match table {
            ElementTable::ExtGrid => &mut self.ext_grid,
            ElementTable::Load => &mut self.load,
            ElementTable::Generation => &mut self.generation,
            ElementTable::Storage => &mut self.storage,
        }
    }

    /// Iterate over in-service elements bound to a resource, in table order then row order
    pub fn active_elements(&self) -> impl Iterator<Item = (&Element, &dyn Resource)> {
        ElementTable::iter()
            .flat_map(move |table| self.table(table).iter())
            .filter(|element| element.in_service)
            .filter_map(|element| Some((element, element.resource.as_deref()?)))
    }

    /// Iterate over in-service lines bound to a resource, in row order
    pub fn active_lines(&self) -> impl Iterator<Item = (&LineElement, &TransmissionLine)> {
        self.line
            .iter()
            .filter(|line| line.in_service)
            .filter_map(|line| Some((line, line.resource.as_ref()?)))
    }
}
