use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use db::{DbErr, models::task_dependency::TaskDependency};
use sea_orm::ConnectionTrait;

/// Outgoing dependency edges keyed by task row id.
#[async_trait]
pub trait DependencyEdges: Send + Sync {
    async fn depends_on(&self, task_row_id: i64) -> Result<Vec<i64>, DbErr>;
}

pub struct DbDependencyEdges<'a, C> {
    db: &'a C,
}

impl<'a, C> DbDependencyEdges<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }
}

#[async_trait]
impl<C> DependencyEdges for DbDependencyEdges<'_, C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn depends_on(&self, task_row_id: i64) -> Result<Vec<i64>, DbErr> {
        TaskDependency::depends_on_row_ids(self.db, task_row_id).await
    }
}

/// Whether adding `task -> depends_on` would close a cycle, i.e. `task` is
/// reachable from `depends_on` within `max_depth` hops.
///
/// Paths longer than `max_depth` are not explored and count as no cycle.
pub async fn would_create_cycle<E>(
    edges: &E,
    task_row_id: i64,
    depends_on_row_id: i64,
    max_depth: usize,
) -> Result<bool, DbErr>
where
    E: DependencyEdges + ?Sized,
{
    if task_row_id == depends_on_row_id {
        return Ok(true);
    }

    let mut visited = HashSet::from([depends_on_row_id]);
    let mut queue = VecDeque::from([(depends_on_row_id, 0usize)]);
    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            tracing::debug!(
                task_row_id,
                depends_on_row_id,
                max_depth,
                "cycle search stopped at depth limit"
            );
            continue;
        }
        for next in edges.depends_on(current).await? {
            if next == task_row_id {
                return Ok(true);
            }
            if visited.insert(next) {
                queue.push_back((next, depth + 1));
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct Graph(HashMap<i64, Vec<i64>>);

    impl Graph {
        fn new(edges: &[(i64, i64)]) -> Self {
            let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
            for (from, to) in edges {
                map.entry(*from).or_default().push(*to);
            }
            Self(map)
        }
    }

    #[async_trait]
    impl DependencyEdges for Graph {
        async fn depends_on(&self, task_row_id: i64) -> Result<Vec<i64>, DbErr> {
            Ok(self.0.get(&task_row_id).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn detects_back_edge() {
        let graph = Graph::new(&[(2, 3), (3, 1)]);
        assert!(would_create_cycle(&graph, 1, 2, 64).await.unwrap());
    }

    #[tokio::test]
    async fn unrelated_edge_is_clear() {
        let graph = Graph::new(&[(2, 3), (4, 1)]);
        assert!(!would_create_cycle(&graph, 1, 2, 64).await.unwrap());
    }

    #[tokio::test]
    async fn depth_limit_bounds_the_search() {
        let graph = Graph::new(&[(2, 3), (3, 4), (4, 5), (5, 1)]);
        assert!(would_create_cycle(&graph, 1, 2, 4).await.unwrap());
        assert!(!would_create_cycle(&graph, 1, 2, 3).await.unwrap());
    }

    #[tokio::test]
    async fn tolerates_existing_cycles_elsewhere() {
        let graph = Graph::new(&[(2, 3), (3, 2)]);
        assert!(!would_create_cycle(&graph, 1, 2, 64).await.unwrap());
    }
}
