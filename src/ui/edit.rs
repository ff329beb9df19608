use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::contact::{Contact, Field};
use crate::store::ContactId;

/// What a committed form writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormTarget {
    New,
    Existing(ContactId),
}

/// Editor for all eight fields of one contact. Committing produces a full
/// replacement record, never a partial patch.
pub struct ContactForm {
    target: FormTarget,
    inputs: Vec<(Field, Input)>,
    focused: usize,
    /// Record being edited; keeps keys outside the eight known fields.
    base: Contact,
}

impl ContactForm {
    pub fn new_contact() -> Self {
        Self::build(FormTarget::New, Contact::default())
    }

    pub fn edit(id: ContactId, contact: &Contact) -> Self {
        Self::build(FormTarget::Existing(id), contact.clone())
    }

    fn build(target: FormTarget, base: Contact) -> Self {
        let inputs = Field::ALL
            .iter()
            .map(|field| {
                let current = base.get(*field).unwrap_or_default().to_string();
                (*field, Input::new(current))
            })
            .collect();
        Self {
            target,
            inputs,
            focused: 0,
            base,
        }
    }

    pub fn target(&self) -> FormTarget {
        self.target
    }

    pub fn title(&self) -> &'static str {
        match self.target {
            FormTarget::New => "NEW CONTACT",
            FormTarget::Existing(_) => "EDIT CONTACT",
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &str)> {
        self.inputs.iter().map(|(field, input)| (*field, input.value()))
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    pub fn visual_cursor(&self) -> usize {
        self.inputs[self.focused].1.visual_cursor()
    }

    pub fn focus_next(&mut self) {
        self.focused = (self.focused + 1) % self.inputs.len();
    }

    pub fn focus_prev(&mut self) {
        self.focused = (self.focused + self.inputs.len() - 1) % self.inputs.len();
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.inputs[self.focused]
            .1
            .handle_event(&Event::Key(key))
            .is_some()
    }

    /// The record described by the form. Every known field is written, empty
    /// ones as empty strings, matching what a blank form template holds.
    pub fn to_contact(&self) -> Contact {
        let mut contact = self.base.clone();
        for (field, input) in &self.inputs {
            contact.set(*field, Some(input.value().to_string()));
        }
        contact
    }
}
