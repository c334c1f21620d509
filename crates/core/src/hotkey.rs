//! Global hotkey registration and dispatch.
//!
//! [`HotkeyRegistry`] owns the process-wide table of key bindings. The OS
//! transport is abstracted behind [`HotkeyBackend`] so the registry logic
//! (unique ids, idempotent unregistration, rebind-without-leak, deferred
//! dispatch) is testable without touching real OS registrations; the
//! production backend wraps the `global-hotkey` crate.
//!
//! Dispatch is deliberately two-phase: the OS event handler only enqueues
//! the matching binding id via [`HotkeyRegistry::handle_os_event`], and the
//! stored callback runs later when the main loop calls
//! [`HotkeyRegistry::poll`]. Callbacks that open windows must never run
//! inside the low-level OS event frame.

use crate::error::{AppError, Result};
use global_hotkey::GlobalHotKeyManager;
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Registry-assigned binding id, unique for the process lifetime.
pub type BindingId = u32;

/// Backend-assigned id for one native registration.
pub type NativeHotkeyId = u32;

/// A parsed key combination: modifier set plus one named key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
    /// Canonical uppercase key name: `A`-`Z`, `0`-`9` or `F1`-`F12`.
    pub key: String,
}

impl KeyCombo {
    /// Parses a combination like `"ctrl+shift+2"` or `"cmd+alt+F3"`.
    ///
    /// Modifier aliases follow common conventions: `cmd`/`super`/`win` all
    /// mean the meta key, `option` means alt.
    pub fn parse(input: &str) -> Result<Self> {
        let mut combo = Self {
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
            key: String::new(),
        };

        for part in input.split('+') {
            let part = part.trim();
            match part.to_ascii_lowercase().as_str() {
                "" => return Err(AppError::hotkey(format!("empty token in '{input}'"))),
                "ctrl" | "control" => combo.ctrl = true,
                "shift" => combo.shift = true,
                "alt" | "option" => combo.alt = true,
                "meta" | "cmd" | "super" | "win" => combo.meta = true,
                key => {
                    if !combo.key.is_empty() {
                        return Err(AppError::hotkey(format!(
                            "more than one non-modifier key in '{input}'"
                        )));
                    }
                    combo.key = key.to_ascii_uppercase();
                }
            }
        }

        if combo.key.is_empty() {
            return Err(AppError::hotkey(format!("no key in '{input}'")));
        }
        Ok(combo)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "ctrl+")?;
        }
        if self.shift {
            write!(f, "shift+")?;
        }
        if self.alt {
            write!(f, "alt+")?;
        }
        if self.meta {
            write!(f, "meta+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// The OS-facing half of hotkey handling.
///
/// Implementations register/unregister one combination at a time and report
/// key events through their own channel; the registry maps those native ids
/// back to bindings.
pub trait HotkeyBackend {
    fn register(&mut self, combo: &KeyCombo) -> Result<NativeHotkeyId>;
    fn unregister(&mut self, native: NativeHotkeyId) -> Result<()>;
}

/// Production backend over the `global-hotkey` crate.
pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    registered: HashMap<NativeHotkeyId, HotKey>,
}

impl GlobalHotkeyBackend {
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| AppError::hotkey(format!("hotkey manager unavailable: {e}")))?;
        Ok(Self {
            manager,
            registered: HashMap::new(),
        })
    }

    fn to_hotkey(combo: &KeyCombo) -> Result<HotKey> {
        let mut modifiers = Modifiers::empty();
        if combo.ctrl {
            modifiers |= Modifiers::CONTROL;
        }
        if combo.shift {
            modifiers |= Modifiers::SHIFT;
        }
        if combo.alt {
            modifiers |= Modifiers::ALT;
        }
        if combo.meta {
            modifiers |= Modifiers::META;
        }
        let mods = if modifiers.is_empty() {
            None
        } else {
            Some(modifiers)
        };
        Ok(HotKey::new(mods, key_code(&combo.key)?))
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn register(&mut self, combo: &KeyCombo) -> Result<NativeHotkeyId> {
        let hotkey = Self::to_hotkey(combo)?;
        self.manager
            .register(hotkey)
            .map_err(|e| AppError::hotkey(format!("OS refused {combo}: {e}")))?;
        let native = hotkey.id();
        self.registered.insert(native, hotkey);
        Ok(native)
    }

    fn unregister(&mut self, native: NativeHotkeyId) -> Result<()> {
        if let Some(hotkey) = self.registered.remove(&native) {
            self.manager
                .unregister(hotkey)
                .map_err(|e| AppError::hotkey(format!("unregister failed: {e}")))?;
        }
        Ok(())
    }
}

fn key_code(key: &str) -> Result<Code> {
    let code = match key {
        "A" => Code::KeyA,
        "B" => Code::KeyB,
        "C" => Code::KeyC,
        "D" => Code::KeyD,
        "E" => Code::KeyE,
        "F" => Code::KeyF,
        "G" => Code::KeyG,
        "H" => Code::KeyH,
        "I" => Code::KeyI,
        "J" => Code::KeyJ,
        "K" => Code::KeyK,
        "L" => Code::KeyL,
        "M" => Code::KeyM,
        "N" => Code::KeyN,
        "O" => Code::KeyO,
        "P" => Code::KeyP,
        "Q" => Code::KeyQ,
        "R" => Code::KeyR,
        "S" => Code::KeyS,
        "T" => Code::KeyT,
        "U" => Code::KeyU,
        "V" => Code::KeyV,
        "W" => Code::KeyW,
        "X" => Code::KeyX,
        "Y" => Code::KeyY,
        "Z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "F1" => Code::F1,
        "F2" => Code::F2,
        "F3" => Code::F3,
        "F4" => Code::F4,
        "F5" => Code::F5,
        "F6" => Code::F6,
        "F7" => Code::F7,
        "F8" => Code::F8,
        "F9" => Code::F9,
        "F10" => Code::F10,
        "F11" => Code::F11,
        "F12" => Code::F12,
        other => return Err(AppError::hotkey(format!("unsupported key '{other}'"))),
    };
    Ok(code)
}

type Callback = Box<dyn FnMut()>;

struct Binding {
    combo: KeyCombo,
    native: NativeHotkeyId,
    callback: Callback,
}

/// Process-wide hotkey table with deferred main-context dispatch.
///
/// The table is mutated only on the main context. Binding ids increase
/// monotonically and are never reused within the process, so a stale id
/// held by a caller can never alias a newer binding.
pub struct HotkeyRegistry<B: HotkeyBackend> {
    backend: B,
    bindings: HashMap<BindingId, Binding>,
    native_index: HashMap<NativeHotkeyId, BindingId>,
    pending: VecDeque<BindingId>,
    next_id: BindingId,
}

impl<B: HotkeyBackend> HotkeyRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            bindings: HashMap::new(),
            native_index: HashMap::new(),
            pending: VecDeque::new(),
            next_id: 1,
        }
    }

    /// Registers a combination and stores its callback.
    ///
    /// Fails if the OS refuses the combination or if this registry already
    /// holds it; re-registering a changed binding goes through
    /// [`HotkeyRegistry::rebind`] instead.
    pub fn register(
        &mut self,
        combo: KeyCombo,
        callback: impl FnMut() + 'static,
    ) -> Result<BindingId> {
        if self.bindings.values().any(|b| b.combo == combo) {
            return Err(AppError::hotkey(format!("{combo} is already registered")));
        }

        let native = self.backend.register(&combo)?;
        let id = self.next_id;
        self.next_id += 1;

        log::debug!("registered hotkey {combo} as binding {id}");
        self.native_index.insert(native, id);
        self.bindings.insert(
            id,
            Binding {
                combo,
                native,
                callback: Box::new(callback),
            },
        );
        Ok(id)
    }

    /// Removes a binding and its native registration.
    ///
    /// Unknown ids are a silent no-op: teardown commonly races with process
    /// shutdown, and double-unregistration must not be an error.
    pub fn unregister(&mut self, id: BindingId) {
        let Some(binding) = self.bindings.remove(&id) else {
            return;
        };
        self.native_index.remove(&binding.native);
        self.pending.retain(|&queued| queued != id);
        if let Err(e) = self.backend.unregister(binding.native) {
            log::warn!("failed to unregister hotkey {}: {e}", binding.combo);
        }
    }

    /// Replaces the binding in a slot with a new combination.
    ///
    /// The old id (if any) is unregistered first, so the backend never holds
    /// two native registrations for one slot.
    pub fn rebind(
        &mut self,
        old: Option<BindingId>,
        combo: KeyCombo,
        callback: impl FnMut() + 'static,
    ) -> Result<BindingId> {
        if let Some(old) = old {
            self.unregister(old);
        }
        self.register(combo, callback)
    }

    /// Drops every binding; called at process teardown.
    pub fn unregister_all(&mut self) {
        let ids: Vec<BindingId> = self.bindings.keys().copied().collect();
        for id in ids {
            self.unregister(id);
        }
    }

    /// Called from the OS event path with the native id of a fired hotkey.
    ///
    /// Only enqueues; the callback runs on the next [`HotkeyRegistry::poll`].
    pub fn handle_os_event(&mut self, native: NativeHotkeyId) {
        match self.native_index.get(&native) {
            Some(&id) => self.pending.push_back(id),
            None => log::debug!("hotkey event for unknown native id {native}"),
        }
    }

    /// Runs the callbacks of all hotkeys fired since the last poll.
    pub fn poll(&mut self) {
        while let Some(id) = self.pending.pop_front() {
            if let Some(binding) = self.bindings.get_mut(&id) {
                (binding.callback)();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<B: HotkeyBackend> Drop for HotkeyRegistry<B> {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records backend calls; native ids count up from 100.
    #[derive(Default)]
    struct FakeBackend {
        live: Rc<RefCell<Vec<NativeHotkeyId>>>,
        next_native: NativeHotkeyId,
        refuse: bool,
    }

    impl FakeBackend {
        fn new() -> (Self, Rc<RefCell<Vec<NativeHotkeyId>>>) {
            let live = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    live: live.clone(),
                    next_native: 100,
                    refuse: false,
                },
                live,
            )
        }
    }

    impl HotkeyBackend for FakeBackend {
        fn register(&mut self, _combo: &KeyCombo) -> Result<NativeHotkeyId> {
            if self.refuse {
                return Err(AppError::hotkey("refused"));
            }
            self.next_native += 1;
            self.live.borrow_mut().push(self.next_native);
            Ok(self.next_native)
        }

        fn unregister(&mut self, native: NativeHotkeyId) -> Result<()> {
            self.live.borrow_mut().retain(|&n| n != native);
            Ok(())
        }
    }

    fn combo(input: &str) -> KeyCombo {
        KeyCombo::parse(input).unwrap()
    }

    #[test]
    fn parse_accepts_modifier_aliases() {
        let parsed = combo("cmd+option+F3");
        assert!(parsed.meta && parsed.alt && !parsed.ctrl && !parsed.shift);
        assert_eq!(parsed.key, "F3");
        assert_eq!(combo("ctrl+shift+2").to_string(), "ctrl+shift+2");
    }

    #[test]
    fn parse_rejects_bad_specs() {
        assert!(KeyCombo::parse("ctrl+shift").is_err());
        assert!(KeyCombo::parse("ctrl+a+b").is_err());
        assert!(KeyCombo::parse("").is_err());
    }

    #[test]
    fn ids_are_unique_and_never_reused() {
        let (backend, _) = FakeBackend::new();
        let mut registry = HotkeyRegistry::new(backend);

        let a = registry.register(combo("ctrl+1"), || {}).unwrap();
        let b = registry.register(combo("ctrl+2"), || {}).unwrap();
        assert_ne!(a, b);

        registry.unregister(a);
        let c = registry.register(combo("ctrl+3"), || {}).unwrap();
        assert!(c > b, "freed ids must not be handed out again");
    }

    #[test]
    fn duplicate_combo_is_refused_locally() {
        let (backend, live) = FakeBackend::new();
        let mut registry = HotkeyRegistry::new(backend);

        registry.register(combo("ctrl+shift+2"), || {}).unwrap();
        let dup = registry.register(combo("ctrl+shift+2"), || {});
        assert!(matches!(dup, Err(AppError::HotkeyRegistration(_))));
        assert_eq!(live.borrow().len(), 1, "no second native registration");
    }

    #[test]
    fn unregister_is_idempotent() {
        let (backend, live) = FakeBackend::new();
        let mut registry = HotkeyRegistry::new(backend);

        let id = registry.register(combo("ctrl+t"), || {}).unwrap();
        registry.unregister(id);
        registry.unregister(id);
        registry.unregister(9999);
        assert!(live.borrow().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn rebind_replaces_native_registration_without_leak() {
        let (backend, live) = FakeBackend::new();
        let mut registry = HotkeyRegistry::new(backend);

        let old = registry.register(combo("ctrl+shift+2"), || {}).unwrap();
        assert_eq!(live.borrow().len(), 1);

        let new = registry.rebind(Some(old), combo("ctrl+shift+3"), || {}).unwrap();
        assert_ne!(old, new);
        assert_eq!(live.borrow().len(), 1, "old native binding must be gone");
    }

    #[test]
    fn dispatch_is_deferred_until_poll() {
        let (backend, _) = FakeBackend::new();
        let mut registry = HotkeyRegistry::new(backend);

        let fired = Rc::new(RefCell::new(0u32));
        let fired_in_callback = fired.clone();
        registry
            .register(combo("ctrl+g"), move || {
                *fired_in_callback.borrow_mut() += 1;
            })
            .unwrap();

        // 101 is the fake backend's first native id.
        registry.handle_os_event(101);
        registry.handle_os_event(101);
        assert_eq!(*fired.borrow(), 0, "OS event path must not run callbacks");

        registry.poll();
        assert_eq!(*fired.borrow(), 2);

        registry.poll();
        assert_eq!(*fired.borrow(), 2, "queue drains exactly once");
    }

    #[test]
    fn events_for_unknown_or_removed_bindings_are_dropped() {
        let (backend, _) = FakeBackend::new();
        let mut registry = HotkeyRegistry::new(backend);

        let fired = Rc::new(RefCell::new(0u32));
        let fired_in_callback = fired.clone();
        let id = registry
            .register(combo("ctrl+g"), move || {
                *fired_in_callback.borrow_mut() += 1;
            })
            .unwrap();

        registry.handle_os_event(42); // never registered
        registry.handle_os_event(101);
        registry.unregister(id); // queued event must die with the binding
        registry.poll();
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn unregister_all_leaves_no_native_bindings() {
        let (backend, live) = FakeBackend::new();
        let mut registry = HotkeyRegistry::new(backend);
        registry.register(combo("ctrl+1"), || {}).unwrap();
        registry.register(combo("ctrl+2"), || {}).unwrap();
        registry.register(combo("f9"), || {}).unwrap();

        registry.unregister_all();
        assert!(live.borrow().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn os_refusal_surfaces_as_registration_error() {
        let (mut backend, _) = FakeBackend::new();
        backend.refuse = true;
        let mut registry = HotkeyRegistry::new(backend);
        let result = registry.register(combo("ctrl+shift+2"), || {});
        assert!(matches!(result, Err(AppError::HotkeyRegistration(_))));
    }
}
