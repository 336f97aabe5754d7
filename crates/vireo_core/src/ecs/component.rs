//! # Component System
//!
//! Components are pure data containers with no behavior. Behavior lives in
//! systems, which read and write component arrays in bulk.

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Send + Sync`: storage may be handed to other threads by the engine
/// - `'static`: their type index is derived from `TypeId`
///
/// An entity owns at most one component of a given type.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Debug, Default)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {}
/// ```
pub trait Component: Send + Sync + 'static {
    /// Human-readable name used in logs and errors.
    #[must_use]
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}
