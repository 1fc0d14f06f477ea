//! Open/closed state, highlight and term handling for one picker.
//!
//! The machine is pure: it consumes [`PickerEvent`]s together with the list
//! currently on screen and returns the [`Effect`]s the owner has to carry out
//! (forward a term to search, notify listeners). It never touches timers or
//! the network.

/// Input events from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
    Focus,
    Blur,
    Type(String),
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
    Tab,
    ClickOutside,
    Clear,
    /// Pointer selection of the row at this index.
    Select(usize),
}

/// Work requested by the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect<E> {
    /// Forward the term to the search orchestrator.
    Search(String),
    /// `entity` was committed.
    Commit(E),
    /// The selection was cleared by the user.
    Cleared,
    Focused,
    Blurred,
}

#[derive(Debug, Clone)]
pub struct SelectionMachine<E> {
    is_open: bool,
    highlighted: Option<usize>,
    raw_term: String,
    selected: Option<E>,
}

impl<E> Default for SelectionMachine<E> {
    fn default() -> Self {
        Self {
            is_open: false,
            highlighted: None,
            raw_term: String::new(),
            selected: None,
        }
    }
}

impl<E: Clone> SelectionMachine<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn raw_term(&self) -> &str {
        &self.raw_term
    }

    pub fn selected(&self) -> Option<&E> {
        self.selected.as_ref()
    }

    /// Preset the committed value without emitting anything.
    pub fn set_value(&mut self, value: Option<E>) {
        self.selected = value;
    }

    /// Keep the highlight inside a list of `len` items.
    pub fn clamp(&mut self, len: usize) {
        if let Some(index) = self.highlighted {
            if index >= len {
                self.highlighted = len.checked_sub(1);
            }
        }
    }

    /// Apply one event against the list currently displayed.
    pub fn handle(&mut self, event: PickerEvent, displayed: &[E]) -> Vec<Effect<E>> {
        self.clamp(displayed.len());

        if !self.is_open {
            match event {
                PickerEvent::ArrowDown | PickerEvent::Enter => {
                    self.is_open = true;
                    return Vec::new();
                }
                PickerEvent::ArrowUp
                | PickerEvent::Escape
                | PickerEvent::Tab
                | PickerEvent::ClickOutside
                | PickerEvent::Select(_) => return Vec::new(),
                _ => {}
            }
        }

        let effects = match event {
            PickerEvent::Focus => {
                self.is_open = true;
                vec![Effect::Focused]
            }
            PickerEvent::Blur => vec![Effect::Blurred],
            PickerEvent::Type(text) => {
                self.raw_term = text.clone();
                self.is_open = true;
                self.highlighted = None;
                vec![Effect::Search(text)]
            }
            PickerEvent::ArrowDown => {
                if !displayed.is_empty() {
                    let next = self.highlighted.map_or(0, |i| i + 1);
                    self.highlighted = Some(next.min(displayed.len() - 1));
                }
                Vec::new()
            }
            PickerEvent::ArrowUp => {
                self.highlighted = match self.highlighted {
                    Some(0) | None => None,
                    Some(i) => Some(i - 1),
                };
                Vec::new()
            }
            PickerEvent::Enter => match self.highlighted.and_then(|i| displayed.get(i)) {
                Some(entity) => self.commit(entity.clone()),
                None => Vec::new(),
            },
            PickerEvent::Select(index) => match displayed.get(index) {
                Some(entity) => self.commit(entity.clone()),
                None => Vec::new(),
            },
            PickerEvent::Escape | PickerEvent::ClickOutside => self.dismiss(),
            PickerEvent::Tab => {
                self.close();
                Vec::new()
            }
            PickerEvent::Clear => {
                self.selected = None;
                self.raw_term.clear();
                self.highlighted = None;
                vec![Effect::Cleared, Effect::Search(String::new())]
            }
        };

        if !self.is_open {
            self.highlighted = None;
        }
        effects
    }

    fn commit(&mut self, entity: E) -> Vec<Effect<E>> {
        self.selected = Some(entity.clone());
        self.close();
        self.raw_term.clear();
        vec![Effect::Commit(entity), Effect::Search(String::new())]
    }

    fn dismiss(&mut self) -> Vec<Effect<E>> {
        self.close();
        if self.selected.is_some() || self.raw_term.is_empty() {
            return Vec::new();
        }
        self.raw_term.clear();
        vec![Effect::Search(String::new())]
    }

    fn close(&mut self) {
        self.is_open = false;
        self.highlighted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<&'static str> {
        vec!["Acme Corporation", "Global Supplies Inc", "Acme Logistics"]
    }

    fn open_machine() -> SelectionMachine<&'static str> {
        let mut machine = SelectionMachine::new();
        machine.handle(PickerEvent::Focus, &items());
        machine
    }

    #[test]
    fn test_initial_state() {
        let machine: SelectionMachine<&str> = SelectionMachine::new();
        assert!(!machine.is_open());
        assert_eq!(machine.highlighted(), None);
        assert_eq!(machine.raw_term(), "");
        assert!(machine.selected().is_none());
    }

    #[test]
    fn test_typing_opens_and_resets_highlight() {
        let mut machine = open_machine();
        machine.handle(PickerEvent::ArrowDown, &items());
        machine.handle(PickerEvent::Tab, &items());
        assert!(!machine.is_open());

        let effects = machine.handle(PickerEvent::Type("ac".into()), &items());
        assert_eq!(effects, vec![Effect::Search("ac".into())]);
        assert!(machine.is_open());
        assert_eq!(machine.highlighted(), None);
        assert_eq!(machine.raw_term(), "ac");
    }

    #[test]
    fn test_arrows_stay_in_bounds() {
        let mut machine = open_machine();
        for _ in 0..5 {
            machine.handle(PickerEvent::ArrowDown, &items());
        }
        assert_eq!(machine.highlighted(), Some(2));

        for _ in 0..5 {
            machine.handle(PickerEvent::ArrowUp, &items());
        }
        assert_eq!(machine.highlighted(), None);
    }

    #[test]
    fn test_closed_arrow_down_and_enter_only_open() {
        let mut machine: SelectionMachine<&str> = SelectionMachine::new();
        assert!(machine.handle(PickerEvent::Enter, &items()).is_empty());
        assert!(machine.is_open());
        assert_eq!(machine.highlighted(), None);

        machine.handle(PickerEvent::Tab, &items());
        assert!(machine.handle(PickerEvent::ArrowDown, &items()).is_empty());
        assert!(machine.is_open());
        assert_eq!(machine.highlighted(), None);
    }

    #[test]
    fn test_enter_commits_highlighted() {
        let mut machine = open_machine();
        machine.handle(PickerEvent::Type("acme".into()), &items());
        machine.handle(PickerEvent::ArrowDown, &items());

        let effects = machine.handle(PickerEvent::Enter, &items());
        assert_eq!(
            effects,
            vec![Effect::Commit("Acme Corporation"), Effect::Search(String::new())]
        );
        assert!(!machine.is_open());
        assert_eq!(machine.raw_term(), "");
        assert_eq!(machine.selected(), Some(&"Acme Corporation"));
    }

    #[test]
    fn test_enter_without_highlight_does_nothing() {
        let mut machine = open_machine();
        assert!(machine.handle(PickerEvent::Enter, &items()).is_empty());
        assert!(machine.is_open());
    }

    #[test]
    fn test_select_commits_clicked_row() {
        let mut machine = open_machine();
        let effects = machine.handle(PickerEvent::Select(1), &items());
        assert_eq!(effects[0], Effect::Commit("Global Supplies Inc"));
        assert!(machine.handle(PickerEvent::Select(9), &items()).is_empty());
    }

    #[test]
    fn test_escape_clears_term_only_without_selection() {
        let mut machine = open_machine();
        machine.handle(PickerEvent::Type("glo".into()), &items());
        let effects = machine.handle(PickerEvent::Escape, &items());
        assert_eq!(effects, vec![Effect::Search(String::new())]);
        assert!(!machine.is_open());
        assert_eq!(machine.raw_term(), "");

        machine.set_value(Some("Acme Corporation"));
        machine.handle(PickerEvent::Type("glo".into()), &items());
        assert!(machine.handle(PickerEvent::ClickOutside, &items()).is_empty());
        assert!(!machine.is_open());
        assert_eq!(machine.raw_term(), "glo");
    }

    #[test]
    fn test_events_while_closed_are_ignored() {
        let mut machine: SelectionMachine<&str> = SelectionMachine::new();
        for event in [
            PickerEvent::ArrowUp,
            PickerEvent::Escape,
            PickerEvent::ClickOutside,
            PickerEvent::Tab,
            PickerEvent::Select(0),
        ] {
            assert!(machine.handle(event, &items()).is_empty());
            assert!(!machine.is_open());
        }
    }

    #[test]
    fn test_clear_keeps_open_state_and_resets() {
        let mut machine = open_machine();
        machine.set_value(Some("Acme Corporation"));
        machine.handle(PickerEvent::Type("ac".into()), &items());
        machine.handle(PickerEvent::ArrowDown, &items());

        let effects = machine.handle(PickerEvent::Clear, &items());
        assert_eq!(effects, vec![Effect::Cleared, Effect::Search(String::new())]);
        assert!(machine.is_open());
        assert!(machine.selected().is_none());
        assert_eq!(machine.highlighted(), None);
        assert_eq!(machine.raw_term(), "");
    }

    #[test]
    fn test_clamp_on_shrinking_list() {
        let mut machine = open_machine();
        machine.handle(PickerEvent::ArrowDown, &items());
        machine.handle(PickerEvent::ArrowDown, &items());
        machine.handle(PickerEvent::ArrowDown, &items());
        assert_eq!(machine.highlighted(), Some(2));

        machine.clamp(1);
        assert_eq!(machine.highlighted(), Some(0));
        machine.clamp(0);
        assert_eq!(machine.highlighted(), None);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn event() -> impl Strategy<Value = PickerEvent> {
            prop_oneof![
                Just(PickerEvent::Focus),
                Just(PickerEvent::Blur),
                "[a-c]{0,2}".prop_map(PickerEvent::Type),
                Just(PickerEvent::ArrowDown),
                Just(PickerEvent::ArrowUp),
                Just(PickerEvent::Enter),
                Just(PickerEvent::Escape),
                Just(PickerEvent::Tab),
                Just(PickerEvent::ClickOutside),
                Just(PickerEvent::Clear),
                (0usize..6).prop_map(PickerEvent::Select),
            ]
        }

        proptest! {
            #[test]
            fn highlight_stays_in_range(
                steps in proptest::collection::vec((event(), 0usize..6), 1..60)
            ) {
                let mut machine = SelectionMachine::new();
                for (event, len) in steps {
                    let displayed: Vec<usize> = (0..len).collect();
                    machine.handle(event, &displayed);

                    if let Some(index) = machine.highlighted() {
                        prop_assert!(index < len);
                    }
                    if !machine.is_open() {
                        prop_assert_eq!(machine.highlighted(), None);
                    }
                }
            }
        }
    }
}
