//! Connected-component clustering over plane indices.

/// Group `count` items into connected components.
///
/// `adjacent(i, j)` decides whether two items are directly connected; the
/// components are the transitive closure. BFS over an adjacency test keeps
/// this quadratic, which is fine at the plane counts a room scan produces.
pub fn connected_components<F>(count: usize, adjacent: F) -> Vec<Vec<usize>>
where
    F: Fn(usize, usize) -> bool,
{
    let mut visited = vec![false; count];
    let mut components = Vec::new();

    for start in 0..count {
        if visited[start] {
            continue;
        }
        visited[start] = true;

        let mut component = vec![start];
        let mut queue = vec![start];
        while let Some(current) = queue.pop() {
            for candidate in 0..count {
                if !visited[candidate] && adjacent(current, candidate) {
                    visited[candidate] = true;
                    component.push(candidate);
                    queue.push(candidate);
                }
            }
        }
        components.push(component);
    }

    components
}
