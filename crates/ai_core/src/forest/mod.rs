//! Forest classifier inference
//!
//! Models are serialized as JSON with the following structure:
//!
//! ```json
//! {
//!   "version": 1,
//!   "scale": 1000000,
//!   "n_features": 2,
//!   "classes": [0, 1],
//!   "trees": [
//!     {
//!       "nodes": [
//!         {"id":0,"left":1,"right":2,"feature_idx":0,"threshold":50000000,"leaf":null},
//!         {"id":1,"left":-1,"right":-1,"feature_idx":-1,"threshold":0,"leaf":[9,1]},
//!         {"id":2,"left":-1,"right":-1,"feature_idx":-1,"threshold":0,"leaf":[2,8]}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! `classes` may hold integer indices (resolved through a label encoder) or
//! string labels. Each leaf carries one weight per class; the forest's
//! probability for a class is the mean of the per-tree normalized weights.
//!
//! # Usage
//!
//! ```rust
//! use krushi_ai_core::forest::{ForestClassifier, Node, Tree, SCALE};
//! use krushi_ai_core::{ClassId, Classifier};
//!
//! let tree = Tree::new(vec![
//!     Node::internal(0, 0, 50 * SCALE, 1, 2),
//!     Node::leaf(1, vec![9, 1]),
//!     Node::leaf(2, vec![2, 8]),
//! ]);
//! let model = ForestClassifier::new(1, vec![ClassId::Index(0), ClassId::Index(1)], vec![tree]);
//!
//! assert_eq!(model.predict(&[30.0]).unwrap(), ClassId::Index(0));
//! let proba = model.predict_proba(&[70.0]).unwrap().unwrap();
//! assert!((proba[1] - 0.8).abs() < 1e-9);
//! ```

pub mod model;
pub mod tree;

pub use model::{to_fixed, ForestClassifier, ModelError, SCALE};
pub use tree::{Node, Tree};
