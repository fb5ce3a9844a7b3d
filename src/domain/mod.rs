// Domain layer: derived settings model, no I/O.

pub mod model;
