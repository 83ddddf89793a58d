//! Connectivity checks on the bus graph of a network.
use crate::network::Network;
use itertools::Itertools;
use log::warn;
use petgraph::Undirected;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::unionfind::UnionFind;

/// A graph with one node per bus (weighted by bus index) and one edge per in-service line
/// (weighted by line index)
pub type BusGraph = Graph<usize, usize, Undirected>;

/// Build the bus graph of a network
pub fn create_bus_graph(network: &Network) -> BusGraph {
    let mut graph = BusGraph::with_capacity(network.buses.len(), network.line.len());
    for index in 0..network.buses.len() {
        graph.add_node(index);
    }
    for (index, line) in network.line.iter().enumerate() {
        if line.in_service {
            graph.add_edge(NodeIndex::new(line.from_bus), NodeIndex::new(line.to_bus), index);
        }
    }

    graph
}

/// Group buses into electrically connected islands.
///
/// Islands are ordered by their lowest bus index and each lists its buses in ascending order.
pub fn find_islands(graph: &BusGraph) -> Vec<Vec<usize>> {
    let mut sets = UnionFind::new(graph.node_count());
    for edge in graph.raw_edges() {
        sets.union(edge.source().index(), edge.target().index());
    }

    let labels = sets.into_labeling();
    graph
        .node_indices()
        .map(|node| (labels[node.index()], graph[node]))
        .into_group_map()
        .into_values()
        .map(|mut buses| {
            buses.sort_unstable();
            buses
        })
        .sorted_by_key(|buses| buses[0])
        .collect()
}

/// Check the network for buses that are not connected to the rest.
///
/// Islands are allowed (each one must balance on its own) but usually indicate a missing line, so
/// they are reported as warnings. Returns the islands found.
pub fn check_connectivity(network: &Network) -> Vec<Vec<usize>> {
    let islands = find_islands(&create_bus_graph(network));
    if islands.len() > 1 {
        for island in &islands[1..] {
            let labels = island
                .iter()
                .map(|&bus| network.buses[bus].label(bus))
                .join(", ");
            warn!("Buses [{labels}] are not connected to bus 0 by any in-service line");
        }
    }

    islands
}
