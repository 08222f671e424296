#![forbid(unsafe_code)]

//! Resource dictionaries.
//!
//! A dictionary maps keys to values, optionally qualified by language and
//! platform. Lookup scores every candidate against the active language and
//! platform:
//!
//! | qualifier on resource | score |
//! |-----------------------|-------|
//! | none (wildcard)       | 1     |
//! | equals active value   | 2     |
//! | anything else         | disqualified |
//!
//! The highest total wins; on a tie the resource added first wins. Bindings
//! observe `(dictionary, key)` pairs and are notified when a matching value
//! changes or when the active language or platform changes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use vbind_core::Value;

use crate::reactive::{ObserverHost, ObserverId, Subscription, ValueObserver, Visited};

/// One entry of a dictionary.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    pub key: String,
    pub value: Value,
    pub language: Option<String>,
    pub platform: Option<String>,
}

impl Resource {
    /// An unqualified resource.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            language: None,
            platform: None,
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    fn score(&self, language: Option<&str>, platform: Option<&str>) -> Option<u8> {
        let language = qualifier_score(self.language.as_deref(), language)?;
        let platform = qualifier_score(self.platform.as_deref(), platform)?;
        Some(language + platform)
    }
}

fn qualifier_score(qualifier: Option<&str>, active: Option<&str>) -> Option<u8> {
    match (qualifier, active) {
        (None, _) => Some(1),
        (Some(q), Some(a)) if q.eq_ignore_ascii_case(a) => Some(2),
        (Some(_), _) => None,
    }
}

struct ResourceObserver {
    id: ObserverId,
    dictionary: String,
    key: String,
    observer: Rc<dyn ValueObserver>,
}

/// All dictionaries of one binding context.
pub struct ResourceDictionaries {
    dictionaries: RefCell<AHashMap<String, Vec<Resource>>>,
    language: RefCell<Option<String>>,
    platform: RefCell<Option<String>>,
    next_id: Cell<ObserverId>,
    observers: RefCell<Vec<ResourceObserver>>,
}

impl ResourceDictionaries {
    #[must_use]
    pub fn new(language: Option<String>, platform: Option<String>) -> Self {
        Self {
            dictionaries: RefCell::new(AHashMap::new()),
            language: RefCell::new(language),
            platform: RefCell::new(platform),
            next_id: Cell::new(0),
            observers: RefCell::new(Vec::new()),
        }
    }

    /// Best-matching value for `key` in `dictionary`.
    #[must_use]
    pub fn get_value(&self, dictionary: &str, key: &str) -> Option<Value> {
        let language = self.language.borrow();
        let platform = self.platform.borrow();
        let dictionaries = self.dictionaries.borrow();
        let mut best: Option<(u8, &Resource)> = None;
        for resource in dictionaries.get(dictionary)?.iter().filter(|r| r.key == key) {
            let Some(score) = resource.score(language.as_deref(), platform.as_deref()) else {
                continue;
            };
            if best.is_none_or(|(top, _)| score > top) {
                best = Some((score, resource));
            }
        }
        best.map(|(_, resource)| resource.value.clone())
    }

    /// Add a resource and notify observers of its key.
    pub fn add_resource(&self, dictionary: &str, resource: Resource) {
        let key = resource.key.clone();
        self.dictionaries
            .borrow_mut()
            .entry(dictionary.to_owned())
            .or_default()
            .push(resource);
        self.notify_key(dictionary, &key);
    }

    /// Replace the value of the unqualified resource `key`, adding it if
    /// missing, and notify observers.
    pub fn set_value(&self, dictionary: &str, key: &str, value: impl Into<Value>) {
        let value = value.into();
        {
            let mut dictionaries = self.dictionaries.borrow_mut();
            let entries = dictionaries.entry(dictionary.to_owned()).or_default();
            match entries
                .iter_mut()
                .find(|r| r.key == key && r.language.is_none() && r.platform.is_none())
            {
                Some(existing) => existing.value = value,
                None => entries.push(Resource::new(key, value)),
            }
        }
        self.notify_key(dictionary, key);
    }

    #[must_use]
    pub fn language(&self) -> Option<String> {
        self.language.borrow().clone()
    }

    #[must_use]
    pub fn platform(&self) -> Option<String> {
        self.platform.borrow().clone()
    }

    /// Switch the active language; every observer is re-notified.
    pub fn set_language(&self, language: Option<String>) {
        if *self.language.borrow() == language {
            return;
        }
        self.language.replace(language);
        self.notify_all();
    }

    /// Switch the active platform; every observer is re-notified.
    pub fn set_platform(&self, platform: Option<String>) {
        if *self.platform.borrow() == platform {
            return;
        }
        self.platform.replace(platform);
        self.notify_all();
    }

    /// Observe `(dictionary, key)`.
    pub fn register_observer(
        this: &Rc<Self>,
        dictionary: &str,
        key: &str,
        observer: Rc<dyn ValueObserver>,
    ) -> Subscription {
        let id = this.next_id.get();
        this.next_id.set(id + 1);
        this.observers.borrow_mut().push(ResourceObserver {
            id,
            dictionary: dictionary.to_owned(),
            key: key.to_owned(),
            observer,
        });
        Subscription::new(this, id)
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    fn notify_key(&self, dictionary: &str, key: &str) {
        let targets: Vec<(ObserverId, Rc<dyn ValueObserver>)> = self
            .observers
            .borrow()
            .iter()
            .filter(|o| o.dictionary == dictionary && o.key == key)
            .map(|o| (o.id, Rc::clone(&o.observer)))
            .collect();
        self.dispatch(targets);
    }

    fn notify_all(&self) {
        let targets: Vec<(ObserverId, Rc<dyn ValueObserver>)> = self
            .observers
            .borrow()
            .iter()
            .map(|o| (o.id, Rc::clone(&o.observer)))
            .collect();
        self.dispatch(targets);
    }

    fn dispatch(&self, targets: Vec<(ObserverId, Rc<dyn ValueObserver>)>) {
        tracing::trace!(observers = targets.len(), "resource change");
        let mut stale = Vec::new();
        for (id, observer) in targets {
            if !observer.notify(&mut Visited::new()) {
                stale.push(id);
            }
        }
        if !stale.is_empty() {
            self.observers
                .borrow_mut()
                .retain(|o| !stale.contains(&o.id));
        }
    }
}

impl ObserverHost for ResourceDictionaries {
    fn remove_observer(&self, id: ObserverId) {
        self.observers.borrow_mut().retain(|o| o.id != id);
    }
}

impl fmt::Debug for ResourceDictionaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDictionaries")
            .field("dictionaries", &self.dictionaries.borrow().len())
            .field("language", &*self.language.borrow())
            .field("platform", &*self.platform.borrow())
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Hits(Cell<u32>);

    impl ValueObserver for Hits {
        fn notify(&self, _: &mut Visited) -> bool {
            self.0.set(self.0.get() + 1);
            true
        }
    }

    fn strings() -> Rc<ResourceDictionaries> {
        let res = Rc::new(ResourceDictionaries::new(Some("en".into()), None));
        res.add_resource("Strings", Resource::new("Greeting", "Hello"));
        res.add_resource("Strings", Resource::new("Greeting", "Hallo").with_language("de"));
        res.add_resource("Strings", Resource::new("Greeting", "Howdy").with_language("en"));
        res
    }

    #[test]
    fn exact_language_beats_wildcard() {
        let res = strings();
        assert_eq!(res.get_value("Strings", "Greeting"), Some(Value::from("Howdy")));
        res.set_language(Some("de".into()));
        assert_eq!(res.get_value("Strings", "Greeting"), Some(Value::from("Hallo")));
        res.set_language(Some("fr".into()));
        assert_eq!(res.get_value("Strings", "Greeting"), Some(Value::from("Hello")));
    }

    #[test]
    fn mismatched_qualifier_disqualifies() {
        let res = Rc::new(ResourceDictionaries::new(Some("en".into()), Some("mobile".into())));
        res.add_resource("Theme", Resource::new("Accent", "red").with_platform("desktop"));
        assert_eq!(res.get_value("Theme", "Accent"), None);
        res.add_resource("Theme", Resource::new("Accent", "blue"));
        assert_eq!(res.get_value("Theme", "Accent"), Some(Value::from("blue")));
    }

    #[test]
    fn missing_dictionary_or_key_has_no_value() {
        let res = strings();
        assert_eq!(res.get_value("Nope", "Greeting"), None);
        assert_eq!(res.get_value("Strings", "Nope"), None);
    }

    #[test]
    fn observers_follow_their_key() {
        let res = strings();
        let hits = Rc::new(Hits(Cell::new(0)));
        let sub = ResourceDictionaries::register_observer(&res, "Strings", "Greeting", hits.clone());

        res.set_value("Strings", "Farewell", "Bye");
        assert_eq!(hits.0.get(), 0);
        res.set_value("Strings", "Greeting", "Hi");
        assert_eq!(hits.0.get(), 1);
        res.set_platform(Some("desktop".into()));
        assert_eq!(hits.0.get(), 2);

        drop(sub);
        assert_eq!(res.observer_count(), 0);
        res.set_value("Strings", "Greeting", "Yo");
        assert_eq!(hits.0.get(), 2);
    }

    #[test]
    fn set_value_replaces_the_unqualified_entry() {
        let res = strings();
        res.set_language(None);
        res.set_value("Strings", "Greeting", "Hey");
        assert_eq!(res.get_value("Strings", "Greeting"), Some(Value::from("Hey")));
    }
}
