// Application layer: concrete pipelines wiring sources, the reconciler and emitters.

pub mod pipelines;
