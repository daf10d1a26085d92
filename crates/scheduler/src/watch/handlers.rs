/// Callbacks invoked by a watch for each observed transition.
///
/// All callbacks of one watch run on that watch's task, one at a time, in
/// stream order. They run while the store's write lock is held, so they must
/// not block and must not read the store they are attached to.
pub trait WatchHandlers<T>: Send + 'static {
    fn on_add(&mut self, _item: &T) {}

    fn on_update(&mut self, _old: &T, _new: &T) {}

    /// `may_be_stale` is set when the deletion was inferred from a relist
    /// rather than observed on the watch stream.
    fn on_delete(&mut self, _item: &T, _may_be_stale: bool) {}
}

/// Mirrors a collection without reacting to changes.
impl<T> WatchHandlers<T> for () {}
