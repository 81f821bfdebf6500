use std::collections::HashMap;

use super::polygon::Polygon;

struct BspNode {
    plane: Option<super::polygon::Plane>,
    polygons: Vec<Polygon>,
    front: Option<usize>,
    back: Option<usize>,
}

/// A BSP tree stored as a flat arena rather than boxed child pointers, so
/// `build` and `clip_polygons` can walk it with an explicit stack instead
/// of recursing one stack frame per tree level.
pub struct BspTree {
    nodes: Vec<BspNode>,
    root: Option<usize>,
}

impl BspTree {
    pub fn from_polygons(polygons: Vec<Polygon>, epsilon: f32) -> Self {
        let mut tree = BspTree { nodes: Vec::new(), root: None };
        tree.add_polygons(polygons, epsilon);
        tree
    }

    fn new_node(&mut self) -> usize {
        self.nodes.push(BspNode { plane: None, polygons: Vec::new(), front: None, back: None });
        self.nodes.len() - 1
    }

    /// Inserts `polygons` into the tree, creating a root if this tree was
    /// empty. Equivalent to `build()` in the original recursive algorithm.
    pub fn add_polygons(&mut self, polygons: Vec<Polygon>, epsilon: f32) {
        if polygons.is_empty() {
            return;
        }
        let root = *self.root.get_or_insert_with(|| {
            let n = self.nodes.len();
            self.nodes.push(BspNode { plane: None, polygons: Vec::new(), front: None, back: None });
            n
        });

        let mut stack = vec![(root, polygons)];
        while let Some((node_idx, polys)) = stack.pop() {
            if polys.is_empty() {
                continue;
            }
            if self.nodes[node_idx].plane.is_none() {
                self.nodes[node_idx].plane = Some(polys[0].plane);
            }
            let plane = self.nodes[node_idx].plane.unwrap();

            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            let mut front = Vec::new();
            let mut back = Vec::new();
            for poly in polys {
                plane.split_polygon(poly, epsilon, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
            }
            self.nodes[node_idx].polygons.append(&mut coplanar_front);
            self.nodes[node_idx].polygons.append(&mut coplanar_back);

            if !front.is_empty() {
                let front_idx = match self.nodes[node_idx].front {
                    Some(i) => i,
                    None => {
                        let n = self.new_node();
                        self.nodes[node_idx].front = Some(n);
                        n
                    }
                };
                stack.push((front_idx, front));
            }
            if !back.is_empty() {
                let back_idx = match self.nodes[node_idx].back {
                    Some(i) => i,
                    None => {
                        let n = self.new_node();
                        self.nodes[node_idx].back = Some(n);
                        n
                    }
                };
                stack.push((back_idx, back));
            }
        }
    }

    /// Flips every node's plane, polygon winding, and front/back children.
    /// Equivalent to the classic recursive `invert()`, but since the arena
    /// never holds an orphaned node, a flat pass over every node is
    /// equivalent to a tree walk.
    pub fn invert(&mut self) {
        for node in &mut self.nodes {
            if let Some(plane) = &mut node.plane {
                plane.flip();
            }
            for poly in &mut node.polygons {
                poly.flip();
            }
            std::mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Removes, from every node's polygon list and from `polygons`, all
    /// parts that lie inside `other`. The classic recursive `clipTo`.
    pub fn clip_to(&mut self, other: &BspTree, epsilon: f32) {
        for i in 0..self.nodes.len() {
            let polys = std::mem::take(&mut self.nodes[i].polygons);
            self.nodes[i].polygons = other.clip_polygons(polys, epsilon);
        }
    }

    /// Recursively (but iteratively) removes all polygon fragments that
    /// fall on the back side of any plane in this tree.
    pub fn clip_polygons(&self, polygons: Vec<Polygon>, epsilon: f32) -> Vec<Polygon> {
        let Some(root) = self.root else { return polygons };

        enum Frame {
            Visit(usize, Vec<Polygon>),
            Join(usize),
        }

        let mut stack = vec![Frame::Visit(root, polygons)];
        let mut results: HashMap<usize, Vec<Polygon>> = HashMap::new();
        let mut front_without_child: HashMap<usize, Vec<Polygon>> = HashMap::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Visit(node_idx, polys) => {
                    let node = &self.nodes[node_idx];
                    let plane = node.plane.expect("a built node always carries a plane");

                    let mut coplanar_front = Vec::new();
                    let mut coplanar_back = Vec::new();
                    let mut front = Vec::new();
                    let mut back = Vec::new();
                    for poly in polys {
                        plane.split_polygon(poly, epsilon, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
                    }
                    front.extend(coplanar_front);
                    back.extend(coplanar_back);

                    stack.push(Frame::Join(node_idx));
                    match node.front {
                        Some(f) => stack.push(Frame::Visit(f, front)),
                        None => {
                            front_without_child.insert(node_idx, front);
                        }
                    }
                    if let Some(b) = node.back {
                        stack.push(Frame::Visit(b, back));
                    }
                    // back == None contributes nothing: clipped fully away.
                }
                Frame::Join(node_idx) => {
                    let node = &self.nodes[node_idx];
                    let mut combined = match node.front {
                        Some(f) => results.remove(&f).unwrap_or_default(),
                        None => front_without_child.remove(&node_idx).unwrap_or_default(),
                    };
                    if let Some(b) = node.back {
                        combined.extend(results.remove(&b).unwrap_or_default());
                    }
                    results.insert(node_idx, combined);
                }
            }
        }

        results.remove(&root).unwrap_or_default()
    }

    pub fn all_polygons(&self) -> Vec<Polygon> {
        self.nodes.iter().flat_map(|n| n.polygons.iter().cloned()).collect()
    }
}
