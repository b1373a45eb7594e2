use std::fmt;

use common::{InputPin, PinState};
use itertools::Itertools;

/// A requirement on the level of a single input pin.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Condition {
    pin: InputPin,
    state: PinState,
}

impl Condition {
    pub fn new(pin: &InputPin, state: PinState) -> Condition {
        Condition { pin: pin.clone(), state }
    }

    pub fn pin(&self) -> &InputPin {
        &self.pin
    }

    pub fn state(&self) -> PinState {
        self.state
    }

    /// True if a pin at level `set` satisfies this condition.
    pub fn accepts(&self, set: bool) -> bool {
        match self.state {
            PinState::Active => set,
            PinState::Inactive => !set,
            PinState::Either => true,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.pin.name(), self.state)
    }
}

/// One complete assignment of every flag pin to active or inactive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FlagState {
    index: usize,
    conditions: Vec<Condition>,
    address: u32,
}

impl FlagState {
    /// Every possible flag state, ordered by the address bits of the active flags.
    pub fn all(flags: &[InputPin]) -> Vec<FlagState> {
        let mut states: Vec<FlagState> = (0..1usize << flags.len())
            .map(|combination| {
                let conditions: Vec<Condition> = flags.iter()
                    .enumerate()
                    .map(|(i, pin)| {
                        let set = (combination >> i) & 1 == 1;
                        Condition::new(pin, if set { PinState::Active } else { PinState::Inactive })
                    })
                    .collect();
                let address = conditions.iter()
                    .filter(|c| c.state == PinState::Active)
                    .fold(0, |address, c| address | c.pin.address_bit());

                FlagState { index: 0, conditions, address }
            })
            .collect();

        states.sort_by_key(|s| s.address);
        for (index, state) in states.iter_mut().enumerate() {
            state.index = index;
        }

        states
    }

    /// Position of this state in [`FlagState::all`].
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_set(&self, pin: &InputPin) -> bool {
        self.conditions.iter().any(|c| c.pin == *pin && c.state == PinState::Active)
    }

    pub fn active(&self) -> impl Iterator<Item = &InputPin> + '_ {
        self.conditions.iter()
            .filter(|c| c.state == PinState::Active)
            .map(|c| &c.pin)
    }

    /// The address lines driven high by this state.
    pub fn address(&self) -> u32 {
        self.address
    }
}

impl fmt::Display for FlagState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.conditions.iter().join(", "))
    }
}
