//! Graph queries over the model (link type) and instance (link instance) graphs
//!
//! Both graphs are undirected. The reachable part of a graph is loaded level by
//! level up to the requested depth, then searched in memory.

use super::repository::{LinkInstanceRepository, TypeCatalog};
use crate::contract::{EngineError, LinkInstance, LinkType, ObjectType};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// An undirected edge between two node ids
pub trait Edge: Clone {
    fn endpoints(&self) -> (Uuid, Uuid);

    /// The endpoint opposite `node`, if the edge touches it
    fn other(&self, node: Uuid) -> Option<Uuid> {
        match self.endpoints() {
            (source, target) if source == node => Some(target),
            (source, target) if target == node => Some(source),
            _ => None,
        }
    }
}

impl Edge for LinkType {
    fn endpoints(&self) -> (Uuid, Uuid) {
        (self.source_object_type_id, self.target_object_type_id)
    }
}

impl Edge for LinkInstance {
    fn endpoints(&self) -> (Uuid, Uuid) {
        (self.source_instance_id, self.target_instance_id)
    }
}

/// Node id -> edges touching it, for every node whose edges were loaded
pub type Adjacency<E> = HashMap<Uuid, Vec<E>>;

/// Load the edges of every node closer than `depth` hops to `start`
pub async fn load_adjacency<E, F, Fut>(
    start: Uuid,
    depth: usize,
    mut edges_of: F,
) -> Result<Adjacency<E>, EngineError>
where
    E: Edge,
    F: FnMut(Uuid) -> Fut,
    Fut: Future<Output = Result<Vec<E>, EngineError>>,
{
    let mut adjacency: Adjacency<E> = HashMap::new();
    let mut frontier = vec![start];
    for _ in 0..depth {
        let mut next = Vec::new();
        for node in frontier {
            if adjacency.contains_key(&node) {
                continue;
            }
            let edges = edges_of(node).await?;
            next.extend(
                edges
                    .iter()
                    .filter_map(|edge| edge.other(node))
                    .filter(|other| !adjacency.contains_key(other)),
            );
            adjacency.insert(node, edges);
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    Ok(adjacency)
}

/// Every simple path from `source` to `target` using at most `max_depth` edges
pub fn find_paths<E: Edge>(
    adjacency: &Adjacency<E>,
    source: Uuid,
    target: Uuid,
    max_depth: usize,
) -> Vec<Vec<E>> {
    let mut paths = Vec::new();
    if source == target {
        return paths;
    }
    let mut visited = HashSet::from([source]);
    let mut path = Vec::new();
    walk(adjacency, source, target, max_depth, &mut visited, &mut path, &mut paths);
    paths
}

fn walk<E: Edge>(
    adjacency: &Adjacency<E>,
    node: Uuid,
    target: Uuid,
    max_depth: usize,
    visited: &mut HashSet<Uuid>,
    path: &mut Vec<E>,
    paths: &mut Vec<Vec<E>>,
) {
    if node == target {
        paths.push(path.clone());
        return;
    }
    if path.len() >= max_depth {
        return;
    }
    let Some(edges) = adjacency.get(&node) else {
        return;
    };
    for edge in edges {
        let Some(next) = edge.other(node) else {
            continue;
        };
        if !visited.insert(next) {
            continue;
        }
        path.push(edge.clone());
        walk(adjacency, next, target, max_depth, visited, path, paths);
        path.pop();
        visited.remove(&next);
    }
}

/// Nodes within `depth` hops of `start`, in discovery order, `start` excluded
pub fn reachable<E: Edge>(adjacency: &Adjacency<E>, start: Uuid, depth: usize) -> Vec<Uuid> {
    let mut seen = HashSet::from([start]);
    let mut order = Vec::new();
    let mut queue = VecDeque::from([(start, 0usize)]);
    while let Some((node, distance)) = queue.pop_front() {
        if distance >= depth {
            continue;
        }
        for next in adjacency
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(|edge| edge.other(node))
        {
            if seen.insert(next) {
                order.push(next);
                queue.push_back((next, distance + 1));
            }
        }
    }
    order
}

/// Path and reachability search over both graph levels
pub struct QueryEngine {
    catalog: Arc<dyn TypeCatalog>,
    links: Arc<dyn LinkInstanceRepository>,
}

impl QueryEngine {
    pub fn new(catalog: Arc<dyn TypeCatalog>, links: Arc<dyn LinkInstanceRepository>) -> Self {
        Self { catalog, links }
    }

    async fn object_type(&self, name: &str) -> Result<ObjectType, EngineError> {
        self.catalog
            .get_object_type_by_name(name)
            .await?
            .ok_or_else(|| EngineError::not_found("object_type", name))
    }

    async fn type_graph(&self, start: Uuid, depth: usize) -> Result<Adjacency<LinkType>, EngineError> {
        let catalog = &self.catalog;
        load_adjacency(start, depth, |node| async move {
            Ok::<_, EngineError>(catalog.get_link_types_by_object_type_id(node).await?)
        })
        .await
    }

    async fn instance_graph(
        &self,
        start: Uuid,
        depth: usize,
    ) -> Result<Adjacency<LinkInstance>, EngineError> {
        let links = &self.links;
        load_adjacency(start, depth, |node| async move {
            Ok::<_, EngineError>(links.find_by_instance(node).await?)
        })
        .await
    }

    // ===== Model level =====

    pub async fn find_type_paths(
        &self,
        source_type: &str,
        target_type: &str,
        max_depth: usize,
    ) -> Result<Vec<Vec<LinkType>>, EngineError> {
        let source = self.object_type(source_type).await?;
        let target = self.object_type(target_type).await?;
        let graph = self.type_graph(source.id, max_depth).await?;
        let paths = find_paths(&graph, source.id, target.id, max_depth);
        tracing::debug!(source_type, target_type, max_depth, found = paths.len(), "type paths");
        Ok(paths)
    }

    pub async fn find_reachable_types(
        &self,
        object_type: &str,
        depth: usize,
    ) -> Result<Vec<ObjectType>, EngineError> {
        let origin = self.object_type(object_type).await?;
        let graph = self.type_graph(origin.id, depth).await?;
        let mut types = Vec::new();
        for id in reachable(&graph, origin.id, depth) {
            match self.catalog.get_object_type(id).await? {
                Some(found) => types.push(found),
                None => tracing::warn!(%id, "link type references a missing object type"),
            }
        }
        Ok(types)
    }

    pub async fn find_link_types(&self, object_type: &str) -> Result<Vec<LinkType>, EngineError> {
        let origin = self.object_type(object_type).await?;
        Ok(self
            .catalog
            .get_link_types_by_object_type_id(origin.id)
            .await?)
    }

    // ===== Instance level =====

    pub async fn find_instance_paths(
        &self,
        source_instance: Uuid,
        target_instance: Uuid,
        max_depth: usize,
    ) -> Result<Vec<Vec<LinkInstance>>, EngineError> {
        let graph = self.instance_graph(source_instance, max_depth).await?;
        Ok(find_paths(&graph, source_instance, target_instance, max_depth))
    }

    /// Opposite endpoints of the links touching an instance, optionally of one link type
    pub async fn find_neighbors(
        &self,
        instance_id: Uuid,
        link_type: Option<&str>,
    ) -> Result<Vec<Uuid>, EngineError> {
        let link_type_id = match link_type {
            Some(name) => Some(
                self.catalog
                    .get_link_type_by_name(name)
                    .await?
                    .ok_or_else(|| EngineError::not_found("link_type", name))?
                    .id,
            ),
            None => None,
        };

        let mut seen = HashSet::new();
        Ok(self
            .links
            .find_by_instance(instance_id)
            .await?
            .into_iter()
            .filter(|link| link_type_id.map_or(true, |id| link.link_type_id == id))
            .filter_map(|link| link.other(instance_id))
            .filter(|other| *other != instance_id && seen.insert(*other))
            .collect())
    }

    pub async fn find_related(&self, instance_id: Uuid, depth: usize) -> Result<Vec<Uuid>, EngineError> {
        let graph = self.instance_graph(instance_id, depth).await?;
        Ok(reachable(&graph, instance_id, depth))
    }
}
