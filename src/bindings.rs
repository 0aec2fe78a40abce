/// Index into the binding slots; `x`, `y` and `z` map to 0, 1 and 2.
pub type BindingId = usize;

/// Names of the variables an expression may bind, in [`BindingId`] order.
pub const VARIABLE_NAMES: [&str; 3] = ["x", "y", "z"];

/// Maps a variable name to its [`BindingId`], if it is bindable.
pub fn binding_id(name: &str) -> Option<BindingId> {
    VARIABLE_NAMES.iter().position(|v| *v == name)
}

/// Values for `x`, `y` and `z`, built fresh for each evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bindings {
    slots: [Option<f64>; 3],
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x(x: f64) -> Self {
        Self::new().with(0, x)
    }

    pub fn xy(x: f64, y: f64) -> Self {
        Self::x(x).with(1, y)
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self::xy(x, y).with(2, z)
    }

    pub fn with(mut self, id: BindingId, value: f64) -> Self {
        self.slots[id] = Some(value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        binding_id(name).and_then(|id| self.slots[id])
    }

    pub fn slot(&self, id: BindingId) -> Option<f64> {
        self.slots[id]
    }

    /// Bound `(name, value)` pairs in `x, y, z` order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        VARIABLE_NAMES
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(name, value)| value.map(|v| (*name, v)))
    }

    /// Native closures take all three parameters; unbound ones read as 0.
    pub fn or_zero(&self) -> (f64, f64, f64) {
        (
            self.slots[0].unwrap_or(0.0),
            self.slots[1].unwrap_or(0.0),
            self.slots[2].unwrap_or(0.0),
        )
    }
}
