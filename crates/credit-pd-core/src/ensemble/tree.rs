//! Binary decision trees shared by the forest and the booster.
//!
//! Every row carries two additive statistics `(a, b)`. A [`SplitCriterion`]
//! turns the sums over a node into a cost and a leaf value; a split is kept
//! when it lowers the summed cost of the children below the parent's.
//!
//! | criterion | a | b | cost | leaf |
//! |---|---|---|---|---|
//! | Gini | w·y | w | 2a(b−a)/b | a/b |
//! | Second order | g | h | −a²/(b+λ) | −a/(b+λ) |

use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

use super::features::{Features, FEATURE_COUNT};

const MIN_GAIN: f64 = 1e-12;

pub trait SplitCriterion {
    fn cost(&self, a: f64, b: f64) -> f64;
    fn leaf_value(&self, a: f64, b: f64) -> f64;
    /// Extra admissibility test on a child's `b` sum.
    fn child_allowed(&self, _b: f64) -> bool {
        true
    }
}

/// Weighted Gini impurity; leaves hold the weighted default share.
#[derive(Debug, Clone, Copy)]
pub struct Gini;

impl SplitCriterion for Gini {
    fn cost(&self, a: f64, b: f64) -> f64 {
        if b <= 0.0 {
            0.0
        } else {
            2.0 * a * (b - a) / b
        }
    }

    fn leaf_value(&self, a: f64, b: f64) -> f64 {
        if b <= 0.0 {
            0.0
        } else {
            a / b
        }
    }
}

/// Second-order logistic-loss criterion; leaves hold Newton steps on the margin.
#[derive(Debug, Clone, Copy)]
pub struct SecondOrder {
    pub lambda: f64,
    pub min_child_weight: f64,
}

impl SplitCriterion for SecondOrder {
    fn cost(&self, a: f64, b: f64) -> f64 {
        -(a * a) / (b + self.lambda)
    }

    fn leaf_value(&self, a: f64, b: f64) -> f64 {
        -a / (b + self.lambda)
    }

    fn child_allowed(&self, b: f64) -> bool {
        b >= self.min_child_weight
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn per split; `None` tries all of them.
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Arena-allocated tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct Best {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

struct Builder<'a, C: SplitCriterion> {
    x: &'a [Features],
    a: &'a [f64],
    b: &'a [f64],
    params: TreeParams,
    criterion: &'a C,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grow a tree over the rows in `rows` (duplicates allowed, as produced by
    /// bootstrap sampling).
    pub fn fit<C: SplitCriterion>(
        x: &[Features],
        a: &[f64],
        b: &[f64],
        rows: Vec<usize>,
        params: TreeParams,
        criterion: &C,
        rng: &mut StdRng,
    ) -> Self {
        let mut builder = Builder {
            x,
            a,
            b,
            params,
            criterion,
            rng,
            nodes: Vec::new(),
        };
        builder.grow(rows, 0);
        DecisionTree {
            nodes: builder.nodes,
        }
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = x.get(*feature).copied().unwrap_or(0.0);
                    idx = if v <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

impl<C: SplitCriterion> Builder<'_, C> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let (sum_a, sum_b) = self.sums(&rows);
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.criterion.leaf_value(sum_a, sum_b),
        });

        let depth_ok = self.params.max_depth.map_or(true, |d| depth < d);
        if !depth_ok || rows.len() < self.params.min_samples_split.max(2) {
            return id;
        }

        let parent_cost = self.criterion.cost(sum_a, sum_b);
        let Some(best) = self.best_split(&rows, parent_cost) else {
            return id;
        };

        let left = self.grow(best.left, depth + 1);
        let right = self.grow(best.right, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter()
            .fold((0.0, 0.0), |(sa, sb), &r| (sa + self.a[r], sb + self.b[r]))
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        match self.params.max_features {
            Some(k) if k < FEATURE_COUNT => {
                let mut picked = sample(&mut *self.rng, FEATURE_COUNT, k.max(1)).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..FEATURE_COUNT).collect(),
        }
    }

    fn best_split(&mut self, rows: &[usize], parent_cost: f64) -> Option<Best> {
        let min_leaf = self.params.min_samples_leaf.max(1);
        let (total_a, total_b) = self.sums(rows);
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in self.candidate_features() {
            let mut sorted = rows.to_vec();
            sorted.sort_by(|&i, &j| self.x[i][feature].total_cmp(&self.x[j][feature]));

            let (mut left_a, mut left_b) = (0.0, 0.0);
            for pos in 0..sorted.len() - 1 {
                let r = sorted[pos];
                left_a += self.a[r];
                left_b += self.b[r];

                let here = self.x[r][feature];
                let next = self.x[sorted[pos + 1]][feature];
                if here == next {
                    continue;
                }
                let n_left = pos + 1;
                if n_left < min_leaf || sorted.len() - n_left < min_leaf {
                    continue;
                }
                let (right_a, right_b) = (total_a - left_a, total_b - left_b);
                if !self.criterion.child_allowed(left_b) || !self.criterion.child_allowed(right_b)
                {
                    continue;
                }

                let gain = parent_cost
                    - self.criterion.cost(left_a, left_b)
                    - self.criterion.cost(right_a, right_b);
                if gain > MIN_GAIN && best.map_or(true, |(_, _, g)| gain > g) {
                    let threshold = here + (next - here) / 2.0;
                    best = Some((feature, threshold, gain));
                }
            }
        }

        let (feature, threshold, _) = best?;
        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| self.x[r][feature] <= threshold);
        if left.is_empty() || right.is_empty() {
            return None;
        }
        Some(Best {
            feature,
            threshold,
            left,
            right,
        })
    }
}
