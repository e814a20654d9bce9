//! # vorostep
//!
//! `vorostep` builds planar Voronoi diagrams incrementally, one site at a time, on a
//! rectangular canvas. It is designed to be used in Rust as well as compiled to WebAssembly
//! (WASM), and exposes the construction as a sequence of discrete, observable steps so that it
//! can be animated or stepped through.
//!
//! ## Features
//!
//! - **Tolerance-based decimals**: All geometry runs on [`Scalar`], a 20-decimal fixed-point
//!   value whose equality and ordering ignore differences below `1e-5`.
//! - **Observable phases**: Every insertion publishes [`Phase`] changes to subscribed
//!   [`Observer`]s and to any [`DiagramHandle`].
//! - **Step-by-step or headless**: Outside manual mode, the builder waits on a [`StepGate`]
//!   after each phase until a controller (or an autoplaying [`Player`]) advances it.
//! - **Site layouts**: Random, hex and square [`Distribution`]s for filling the canvas.
//! - **WASM-first**: Built with `wasm-bindgen` for use from JavaScript and TypeScript.
//!
//! ## Example
//!
//! ```
//! use vorostep::{Diagram, Distribution, Point};
//!
//! let mut diagram = Diagram::new(200, 200).unwrap();
//! diagram.add_point(Point::from((50, 50))).unwrap();
//! diagram.add_point(Point::from((150, 150))).unwrap();
//! assert_eq!(diagram.cells().len(), 2);
//!
//! let report = diagram.fill_canvas(10, Distribution::Hex).unwrap();
//! assert!(!report.cancelled);
//! ```
//!
//! See the `demos/` directory for SVG rendering and stepping through an insertion.
//!
//! ## Main Interface
//!
//! The primary entry point is the [`Diagram`] struct, which owns the canvas and its cells.

mod bounds;
mod cell;
mod config;
mod diagram;
mod distribution;
mod error;
mod gate;
mod geometry;
mod observer;
mod player;
mod scalar;
mod wasm;

pub use bounds::{Canvas, Corner, CornerSet, Side};
pub use cell::{Cell, CellId};
pub use config::DiagramConfig;
pub use diagram::{Diagram, DiagramHandle, FillReport};
pub use distribution::Distribution;
pub use error::{DiagramError, DiagramResult, GateError, ScalarError};
pub use gate::StepGate;
pub use geometry::{Point, Segment};
pub use observer::{DiagramEvent, EventLog, Observer, Phase, PhasePayload};
pub use player::Player;
pub use scalar::{PRECISION_COMPARISON, PRECISION_STORE, Scalar};
pub use wasm::{VoronoiCanvas, VoronoiCellWASM};
