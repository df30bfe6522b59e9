//! Declarative application parameter table
//!
//! Every parameter is declared once in the `parameters!` table below. The
//! table generates:
//!
//! - a zero-sized marker type per parameter (`Speed`, `NextStreet`, ...)
//!   implementing [`Parameter`]
//! - the [`Values`] struct holding the current value of every parameter
//! - generic copy-if-changed over a [`ParamSet`], used by batched commits
//!
//! Atomic parameters are stored and returned by value. Shared parameters
//! are stored behind an `Arc`; readers get a clone of the `Arc` and so hold
//! a stable snapshot even if the parameter is overwritten afterwards.

use alloc::string::String;
use alloc::sync::Arc;

use super::types::GpsData;

/// Maximum number of parameters a [`ParamSet`] can address
pub const MAX_PARAMETERS: usize = 32;

/// Bitset of parameter indices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParamSet(u32);

impl ParamSet {
    /// No parameters
    pub const EMPTY: Self = Self(0);
    /// Every parameter
    pub const ALL: Self = Self(u32::MAX);

    /// Set containing only `index`
    pub const fn single(index: u8) -> Self {
        Self(1 << index)
    }

    /// Union of two sets
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether `index` is in the set
    pub const fn contains(self, index: u8) -> bool {
        self.0 & (1 << index) != 0
    }

    /// Check whether the two sets share any parameter
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Check for the empty set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Add `index` to the set
    pub fn insert(&mut self, index: u8) {
        self.0 |= 1 << index;
    }
}

/// A named, typed entry of the application state
pub trait Parameter: 'static {
    /// Value accepted by `set`
    type Value: PartialEq;
    /// Value returned by `get`: the value itself for atomic parameters,
    /// an `Arc` snapshot for shared ones
    type Output;

    /// Position in the parameter table
    const INDEX: u8;
    /// Parameter name, for logging
    const NAME: &'static str;

    /// Read the parameter from a value set
    fn get(values: &Values) -> Self::Output;

    /// Check whether `value` differs from the stored one
    fn differs(values: &Values, value: &Self::Value) -> bool;

    /// Install a new value
    fn put(values: &mut Values, value: Self::Value);
}

/// A compile-time list of parameters
///
/// Implemented for every parameter marker, for tuples of lists and for `()`.
pub trait ParamList {
    /// Bitset of the listed parameters
    fn set() -> ParamSet;
}

impl ParamList for () {
    fn set() -> ParamSet {
        ParamSet::EMPTY
    }
}

macro_rules! tuple_param_list {
    ($($name:ident),+) => {
        impl<$($name: ParamList),+> ParamList for ($($name,)+) {
            fn set() -> ParamSet {
                ParamSet::EMPTY $(.union($name::set()))+
            }
        }
    };
}

tuple_param_list!(A);
tuple_param_list!(A, B);
tuple_param_list!(A, B, C);
tuple_param_list!(A, B, C, D);
tuple_param_list!(A, B, C, D, E);
tuple_param_list!(A, B, C, D, E, F);
tuple_param_list!(A, B, C, D, E, F, G);
tuple_param_list!(A, B, C, D, E, F, G, H);

macro_rules! parameters {
    ($($kind:ident $field:ident: $marker:ident => $ty:ty),+ $(,)?) => {
        /// Current value of every parameter
        #[derive(Debug, Clone, Default)]
        pub struct Values {
            $(pub(crate) $field: parameters!(@stored $kind $ty),)+
        }

        impl Values {
            /// Copy the parameters in `set` from `other` where they differ
            ///
            /// Returns the parameters that were actually changed.
            pub(crate) fn merge_from(&mut self, other: &Values, set: ParamSet) -> ParamSet {
                let mut changed = ParamSet::EMPTY;
                $(
                    if set.contains($marker::INDEX)
                        && parameters!(@ne $kind self.$field, other.$field)
                    {
                        self.$field = other.$field.clone();
                        changed.insert($marker::INDEX);
                    }
                )+
                changed
            }
        }

        parameters!(@markers 0u8; $($kind $field: $marker => $ty,)+);

        const PARAMETER_COUNT: usize = [$(stringify!($marker)),+].len();
        const _: () = assert!(PARAMETER_COUNT <= MAX_PARAMETERS);
    };

    (@markers $index:expr; ) => {};
    (@markers $index:expr; $kind:ident $field:ident: $marker:ident => $ty:ty, $($rest:tt)*) => {
        #[doc = concat!("Marker for the `", stringify!($field), "` parameter")]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $marker;

        impl Parameter for $marker {
            type Value = $ty;
            type Output = parameters!(@output $kind $ty);

            const INDEX: u8 = $index;
            const NAME: &'static str = stringify!($field);

            fn get(values: &Values) -> Self::Output {
                values.$field.clone()
            }

            fn differs(values: &Values, value: &Self::Value) -> bool {
                parameters!(@differs $kind values.$field, value)
            }

            fn put(values: &mut Values, value: Self::Value) {
                values.$field = parameters!(@wrap $kind value);
            }
        }

        impl ParamList for $marker {
            fn set() -> ParamSet {
                ParamSet::single(<$marker as Parameter>::INDEX)
            }
        }

        parameters!(@markers $index + 1; $($rest)*);
    };

    (@stored atomic $ty:ty) => { $ty };
    (@stored shared $ty:ty) => { Arc<$ty> };
    (@output atomic $ty:ty) => { $ty };
    (@output shared $ty:ty) => { Arc<$ty> };
    (@wrap atomic $value:expr) => { $value };
    (@wrap shared $value:expr) => { Arc::new($value) };
    (@differs atomic $stored:expr, $value:expr) => { $stored != *$value };
    (@differs shared $stored:expr, $value:expr) => { *$stored != *$value };
    (@ne atomic $a:expr, $b:expr) => { $a != $b };
    (@ne shared $a:expr, $b:expr) => { !Arc::ptr_eq(&$a, &$b) && *$a != *$b };
}

parameters! {
    atomic speed: Speed => u8,
    atomic battery_millivolts: BatteryMillivolts => u16,
    atomic battery_soc: BatterySoc => u8,
    atomic controller_temperature: ControllerTemperature => u8,
    atomic motor_temperature: MotorTemperature => u8,
    atomic distance_to_next: DistanceToNext => u32,
    atomic total_distance: TotalDistance => u32,
    atomic distance_traveled: DistanceTraveled => u32,
    atomic wh_consumed: WhConsumed => u16,
    atomic wh_regenerated: WhRegenerated => u16,
    atomic current_icon_hash: CurrentIconHash => u32,
    atomic wifi_connected: WifiConnected => bool,
    atomic bluetooth_connected: BluetoothConnected => bool,
    atomic gps_position_valid: GpsPositionValid => bool,
    shared next_street: NextStreet => String,
    shared eta: Eta => String,
    shared position: Position => GpsData,
}
