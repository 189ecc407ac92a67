//! Live Pareto front over a core cache.
//!
//! Membership is kept per application: an entry is a member when its
//! multi-objective vector for that application is not dominated by any
//! other entry of the same application in the core. Entries without a
//! multi-objective vector never qualify.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::{DetachedReader, ViewReader};
use crate::cache::{Cache, CacheExt, CacheRead, KeyQuery, SharedCache};
use crate::cursor::Cursor;
use crate::domain::{AppId, Domain};
use crate::entry::{CacheEntry, EntryId};
use crate::error::{CacheError, CacheResult};
use crate::index::OrderedIndex;
use crate::key::CachedKey;
use crate::response::{FieldTag, ResponseFieldMap};
use crate::signals::{ClearSlot, EraseSlot, InsertSlot, Signals, SubscriptionId, UpdateSlot};

/// Factory name of [`ParetoView`].
pub const PARETO_KIND: &str = "Pareto";

/// Optimization direction of one objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

impl Sense {
    fn better(self, a: f64, b: f64) -> bool {
        match self {
            Self::Minimize => a < b,
            Self::Maximize => a > b,
        }
    }
}

/// Whether `a` dominates `b`: no worse in every objective and strictly
/// better in at least one. Objectives without a configured sense are
/// minimized. Vectors of different lengths are incomparable.
pub fn dominates(a: &[f64], b: &[f64], senses: &[Sense]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut strictly = false;
    for (i, (&x, &y)) in a.iter().zip(b).enumerate() {
        let sense = senses.get(i).copied().unwrap_or_default();
        if sense.better(y, x) {
            return false;
        }
        strictly |= sense.better(x, y);
    }
    strictly
}

fn objectives<'c>(core: &'c dyn CacheRead, app: AppId, id: &EntryId) -> Option<&'c [f64]> {
    core.storage_entry(id)?.response(app)?.objectives()
}

/// Non-dominated entries of `app` among the members of `core`.
fn pareto_front(core: &dyn CacheRead, app: AppId, senses: &[Sense]) -> BTreeSet<EntryId> {
    let points: Vec<(&EntryId, &[f64])> = core
        .iter_app(app)
        .filter_map(|entry| Some((entry.id(), entry.response(app)?.objectives()?)))
        .collect();
    points
        .iter()
        .filter(|(_, p)| !points.iter().any(|(_, q)| dominates(q, p, senses)))
        .map(|(id, _)| EntryId::clone(id))
        .collect()
}

/// Membership changes to re-publish, in order: evictions first.
#[derive(Debug, Default)]
struct Delta {
    evicted: Vec<(AppId, EntryId)>,
    admitted: Vec<(AppId, EntryId)>,
}

impl Delta {
    fn is_empty(&self) -> bool {
        self.evicted.is_empty() && self.admitted.is_empty()
    }

    fn extend(&mut self, other: Delta) {
        self.evicted.extend(other.evicted);
        self.admitted.extend(other.admitted);
    }
}

#[derive(Debug, Default)]
struct ParetoState {
    index: OrderedIndex,
    senses: HashMap<AppId, Vec<Sense>>,
}

impl ParetoState {
    /// Senses of `app`: configured on this view, or else inherited from
    /// `core`, so a view stacked on a view ranks points like its parent.
    fn senses<'a>(&'a self, core: &'a dyn CacheRead, app: AppId) -> &'a [Sense] {
        match self.senses.get(&app) {
            Some(own) => own.as_slice(),
            None => core.objective_senses(app),
        }
    }

    fn reader<'a>(&'a self, core: &'a dyn CacheRead) -> ViewReader<'a> {
        ViewReader::new(core, &self.index, &self.senses)
    }

    /// Incremental admission of one core entry.
    fn admit(&mut self, core: &dyn CacheRead, app: AppId, id: &EntryId) -> Delta {
        let mut delta = Delta::default();
        if self.index.contains_app(app, id) {
            return delta;
        }
        let Some(candidate) = objectives(core, app, id) else {
            return delta;
        };

        let senses = self.senses(core, app);
        let mut dominated = Vec::new();
        for member in self.index.app_ids(app) {
            let Some(existing) = objectives(core, app, member) else {
                continue;
            };
            if dominates(existing, candidate, senses) {
                trace!(%app, seq = id.seq(), "rejected dominated point");
                return delta;
            }
            if dominates(candidate, existing, senses) {
                dominated.push(member.clone());
            }
        }

        for member in dominated {
            self.index.remove(app, &member);
            delta.evicted.push((app, member));
        }
        self.index.insert(app, id.clone());
        delta.admitted.push((app, id.clone()));
        trace!(%app, seq = id.seq(), evicted = delta.evicted.len(), "admitted point");
        delta
    }

    /// Recompute `app`'s membership from scratch.
    fn rescan(&mut self, core: &dyn CacheRead, app: AppId) -> Delta {
        let front = pareto_front(core, app, self.senses(core, app));
        let current: BTreeSet<EntryId> = self.index.app_ids(app).cloned().collect();

        let mut delta = Delta::default();
        for id in current.difference(&front) {
            self.index.remove(app, id);
            delta.evicted.push((app, id.clone()));
        }
        for id in front.difference(&current) {
            self.index.insert(app, id.clone());
            delta.admitted.push((app, id.clone()));
        }
        delta
    }

    fn rescan_all(&mut self, core: &dyn CacheRead) -> Delta {
        let mut apps = core.applications();
        for app in self.index.apps() {
            if !apps.contains(&app) {
                apps.push(app);
            }
        }
        let mut delta = Delta::default();
        for app in apps {
            delta.extend(self.rescan(core, app));
        }
        delta
    }
}

type SharedState = Rc<RefCell<ParetoState>>;
type SharedSignals = Rc<RefCell<Signals>>;

/// What a core subscription holds on to. Weak, so a dropped or re-pointed
/// view turns its leftover slots into no-ops.
#[derive(Clone)]
struct Link {
    state: Weak<RefCell<ParetoState>>,
    signals: Weak<RefCell<Signals>>,
}

impl Link {
    fn upgrade(&self) -> Option<(SharedState, SharedSignals)> {
        Some((self.state.upgrade()?, self.signals.upgrade()?))
    }
}

/// Re-publish `delta` to the view's own subscribers.
fn publish(state: &SharedState, signals: &SharedSignals, core: &dyn CacheRead, delta: &Delta) {
    if delta.is_empty() {
        return;
    }
    debug!(
        evicted = delta.evicted.len(),
        admitted = delta.admitted.len(),
        "pareto membership changed"
    );
    let dispatch = signals.borrow().dispatch();
    let st = state.borrow();
    let reader = st.reader(core);
    for (app, id) in &delta.evicted {
        if let Some(entry) = core.storage_entry(id) {
            dispatch.erased(&reader, *app, entry);
        }
    }
    for (app, id) in &delta.admitted {
        dispatch.inserted(&reader, &Cursor::in_app(*app, Some(id.clone())));
    }
}

fn on_core_insert(state: &SharedState, signals: &SharedSignals, core: &dyn CacheRead, at: &Cursor) {
    let Some(entry) = core.entry(at) else {
        return;
    };
    let apps: Vec<AppId> = match at.app() {
        Some(app) => vec![app],
        None => entry.apps().collect(),
    };
    let mut delta = Delta::default();
    for app in apps {
        delta.extend(state.borrow_mut().admit(core, app, entry.id()));
    }
    publish(state, signals, core, &delta);
}

fn on_core_update(
    state: &SharedState,
    signals: &SharedSignals,
    core: &dyn CacheRead,
    at: &Cursor,
    added: &BTreeSet<FieldTag>,
) {
    let (Some(entry), Some(app)) = (core.entry(at), at.app()) else {
        return;
    };
    let id = entry.id();
    if state.borrow().index.contains_app(app, id) {
        let dispatch = signals.borrow().dispatch();
        let st = state.borrow();
        let reader = st.reader(core);
        dispatch.updated(&reader, &Cursor::in_app(app, Some(id.clone())), added);
        return;
    }
    if added.contains(&FieldTag::MultiObjective) {
        let delta = state.borrow_mut().admit(core, app, id);
        publish(state, signals, core, &delta);
    }
}

fn on_core_erase(
    state: &SharedState,
    signals: &SharedSignals,
    core: &dyn CacheRead,
    app: AppId,
    entry: &CacheEntry,
) {
    if !state.borrow_mut().index.remove(app, entry.id()) {
        return;
    }
    let refill = state.borrow_mut().rescan(core, app);
    {
        let dispatch = signals.borrow().dispatch();
        let st = state.borrow();
        dispatch.erased(&st.reader(core), app, entry);
    }
    publish(state, signals, core, &refill);
}

fn on_core_clear(
    state: &SharedState,
    signals: &SharedSignals,
    core: &dyn CacheRead,
    app: Option<AppId>,
) {
    let changed = {
        let mut st = state.borrow_mut();
        match app {
            None => {
                let had_members = !st.index.is_empty();
                st.index.clear();
                had_members
            }
            Some(app) => !st.index.remove_app(app).is_empty(),
        }
    };
    if !changed {
        return;
    }
    let dispatch = signals.borrow().dispatch();
    let st = state.borrow();
    dispatch.cleared(&st.reader(core), app);
}

fn subscribe(core: &SharedCache, link: &Link) -> Vec<SubscriptionId> {
    let mut core = core.borrow_mut();
    let on_insert = link.clone();
    let on_update = link.clone();
    let on_erase = link.clone();
    let on_clear = link.clone();
    vec![
        core.on_insert(Rc::new(move |reader: &dyn CacheRead, at: &Cursor| {
            if let Some((state, signals)) = on_insert.upgrade() {
                on_core_insert(&state, &signals, reader, at);
            }
        })),
        core.on_update(Rc::new(
            move |reader: &dyn CacheRead, at: &Cursor, added: &BTreeSet<FieldTag>| {
                if let Some((state, signals)) = on_update.upgrade() {
                    on_core_update(&state, &signals, reader, at, added);
                }
            },
        )),
        core.on_erase(Rc::new(
            move |reader: &dyn CacheRead, app: AppId, entry: &CacheEntry| {
                if let Some((state, signals)) = on_erase.upgrade() {
                    on_core_erase(&state, &signals, reader, app, entry);
                }
            },
        )),
        core.on_clear(Rc::new(move |reader: &dyn CacheRead, app: Option<AppId>| {
            if let Some((state, signals)) = on_clear.upgrade() {
                on_core_clear(&state, &signals, reader, app);
            }
        })),
    ]
}

/// A view holding the Pareto-optimal entries of its core cache.
///
/// The view is read-only: `erase` and `clear` in every form fail with
/// [`CacheError::ViewMutation`]. `insert` and the annotation calls are
/// forwarded to the core. Slots registered on the view must read through
/// the reader they are handed, not through the view's handle.
pub struct ParetoView {
    state: SharedState,
    signals: SharedSignals,
    core: Option<SharedCache>,
    core_subscriptions: Vec<SubscriptionId>,
}

impl ParetoView {
    /// An empty, detached view.
    pub fn new() -> Self {
        Self {
            state: Rc::default(),
            signals: Rc::default(),
            core: None,
            core_subscriptions: Vec::new(),
        }
    }

    /// A view attached to `core`.
    pub fn over(core: SharedCache) -> CacheResult<Self> {
        let mut view = Self::new();
        view.set_core_cache(Some(core))?;
        Ok(view)
    }

    pub fn into_shared(self) -> SharedCache {
        Rc::new(RefCell::new(self))
    }

    pub fn core_cache(&self) -> Option<&SharedCache> {
        self.core.as_ref()
    }

    /// Attach to `core`, detaching from any previous core first, and
    /// recompute membership from scratch.
    ///
    /// Current subscribers see a clear of the old membership followed by an
    /// insert per new member.
    pub fn set_core_cache(&mut self, core: Option<SharedCache>) -> CacheResult<()> {
        let core = core.ok_or(CacheError::MissingCore)?;
        self.detach();

        let had_members = !self.state.borrow().index.is_empty();
        let senses = std::mem::take(&mut self.state.borrow_mut().senses);
        self.state = Rc::new(RefCell::new(ParetoState {
            index: OrderedIndex::default(),
            senses,
        }));

        let link = Link {
            state: Rc::downgrade(&self.state),
            signals: Rc::downgrade(&self.signals),
        };
        self.core_subscriptions = subscribe(&core, &link);

        let (state, signals) = (&self.state, &self.signals);
        core.borrow().read(&mut |reader: &dyn CacheRead| {
            if had_members {
                let dispatch = signals.borrow().dispatch();
                let st = state.borrow();
                dispatch.cleared(&st.reader(reader), None);
            }
            let delta = state.borrow_mut().rescan_all(reader);
            publish(state, signals, reader, &delta);
        });

        debug!(
            core = core.borrow().kind(),
            members = self.state.borrow().index.len(),
            "pareto view attached"
        );
        self.core = Some(core);
        Ok(())
    }

    /// Set the objective senses of `app` and recompute its membership.
    ///
    /// The resulting membership changes are re-published, so views stacked
    /// on this one and inheriting its senses recompute as well.
    pub fn set_objective_senses(&mut self, app: AppId, senses: Vec<Sense>) {
        self.state.borrow_mut().senses.insert(app, senses);
        let Some(core) = &self.core else {
            return;
        };
        let (state, signals) = (&self.state, &self.signals);
        core.borrow().read(&mut |reader: &dyn CacheRead| {
            let delta = state.borrow_mut().rescan(reader, app);
            publish(state, signals, reader, &delta);
        });
    }

    /// Senses in effect for `app`, including ones inherited from the core.
    pub fn objective_senses(&self, app: AppId) -> Vec<Sense> {
        self.inspect(|reader| reader.objective_senses(app).to_vec())
    }

    fn detach(&mut self) {
        let Some(core) = self.core.take() else {
            return;
        };
        match core.try_borrow_mut() {
            Ok(mut core) => {
                for id in self.core_subscriptions.drain(..) {
                    core.unsubscribe(id);
                }
                debug!(core = core.kind(), "pareto view detached");
            }
            Err(_) => warn!(
                slots = self.core_subscriptions.len(),
                "core cache busy while detaching; pareto view slots left inert"
            ),
        }
        self.core_subscriptions.clear();
    }

    /// Core cursor for a member `at` denotes.
    fn member(&self, at: &Cursor, operation: &'static str) -> CacheResult<(&SharedCache, Cursor)> {
        let nonexistent = CacheError::NonexistentItem { operation };
        let core = self.core.as_ref().ok_or(nonexistent.clone())?;
        let id = at
            .id()
            .filter(|id| self.state.borrow().index.contains(id))
            .ok_or(nonexistent)?;
        Ok((core, Cursor::global(Some(id.clone()))))
    }
}

impl Default for ParetoView {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ParetoView {
    fn drop(&mut self) {
        self.detach();
    }
}

impl Cache for ParetoView {
    fn kind(&self) -> &'static str {
        PARETO_KIND
    }

    fn read(&self, visit: &mut dyn FnMut(&dyn CacheRead)) {
        let state = self.state.borrow();
        match &self.core {
            Some(core) => core
                .borrow()
                .read(&mut |reader: &dyn CacheRead| visit(&state.reader(reader))),
            None => visit(&DetachedReader::new(&state.index, &state.senses)),
        }
    }

    /// Insert into the core. Reports `inserted` only when the point also
    /// became a member; a dominated point yields the end cursor.
    fn insert(
        &mut self,
        app: AppId,
        domain: &Domain,
        fields: ResponseFieldMap,
    ) -> CacheResult<(Cursor, bool)> {
        let core = self.core.as_ref().ok_or(CacheError::MissingCore)?;
        let (at, inserted) = core.borrow_mut().insert(app, domain, fields)?;
        let state = self.state.borrow();
        match at.id() {
            Some(id) if state.index.contains_app(app, id) => {
                Ok((Cursor::in_app(app, Some(id.clone())), inserted))
            }
            _ => Ok((Cursor::end(), false)),
        }
    }

    fn erase(&mut self, _app: AppId, _query: KeyQuery<'_>) -> CacheResult<usize> {
        Err(CacheError::ViewMutation { operation: "erase" })
    }

    fn erase_app(&mut self, _app: AppId) -> CacheResult<usize> {
        Err(CacheError::ViewMutation { operation: "erase" })
    }

    fn erase_key(&mut self, _key: &CachedKey) -> CacheResult<usize> {
        Err(CacheError::ViewMutation { operation: "erase" })
    }

    fn erase_at(&mut self, _at: &Cursor) -> CacheResult<usize> {
        Err(CacheError::ViewMutation { operation: "erase" })
    }

    fn clear(&mut self) -> CacheResult<()> {
        Err(CacheError::ViewMutation { operation: "clear" })
    }

    fn clear_app(&mut self, _app: AppId) -> CacheResult<()> {
        Err(CacheError::ViewMutation { operation: "clear" })
    }

    fn annotate(&mut self, at: &Cursor, name: &str, value: Value) -> CacheResult<()> {
        let (core, at) = self.member(at, "annotate")?;
        core.borrow_mut().annotate(&at, name, value)
    }

    fn erase_annotation(&mut self, at: &Cursor, name: &str) -> CacheResult<usize> {
        let (core, at) = self.member(at, "erase annotation from")?;
        core.borrow_mut().erase_annotation(&at, name)
    }

    fn erase_annotations(&mut self, at: &Cursor) -> CacheResult<usize> {
        let (core, at) = self.member(at, "erase annotations from")?;
        core.borrow_mut().erase_annotations(&at)
    }

    fn on_insert(&mut self, slot: InsertSlot) -> SubscriptionId {
        self.signals.borrow_mut().on_insert(slot)
    }

    fn on_update(&mut self, slot: UpdateSlot) -> SubscriptionId {
        self.signals.borrow_mut().on_update(slot)
    }

    fn on_erase(&mut self, slot: EraseSlot) -> SubscriptionId {
        self.signals.borrow_mut().on_erase(slot)
    }

    fn on_clear(&mut self, slot: ClearSlot) -> SubscriptionId {
        self.signals.borrow_mut().on_clear(slot)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.signals.borrow_mut().unsubscribe(id)
    }
}
