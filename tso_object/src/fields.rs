//! Per-field value storage
//!
//! A record is a plain tuple `(T0, T1, ..)`. Every element sits behind its
//! own mutex, so a kilohertz writer on one field never contends with a slow
//! reader of another. Typed access goes through [`FieldAt`], which only
//! exists for in-range indices: `store.read::<5>()` on a three-field record
//! does not compile.

use parking_lot::Mutex;
use tso::consts::MAX_FIELDS;

mod private {
    pub trait Sealed {}
}

/// A fixed-arity record whose fields can be stored in a [`FieldStore`].
///
/// Implemented for tuples of 1 to [`MAX_FIELDS`] elements whose element
/// types are `Clone + Send`.
pub trait FieldTuple: private::Sealed + Sized {
    /// One mutex per field, in field order.
    type Slots: Send + Sync;

    /// Number of fields in the record.
    const SIZE: usize;

    /// Move every field into its own slot.
    fn into_slots(self) -> Self::Slots;
}

/// Typed access to field `I` of a record.
pub trait FieldAt<const I: usize>: FieldTuple {
    /// Value type of field `I`.
    type Value: Clone + Send;

    /// Slot guarding field `I`.
    fn slot(slots: &Self::Slots) -> &Mutex<Self::Value>;
}

// `@` arms come first: an `expr` fragment that fails to parse is a hard error.
macro_rules! field_tuple {
    (@one ($($All:ident),+) $idx:tt : $T:ident) => {
        impl<$($All: Clone + Send),+> FieldAt<$idx> for ($($All,)+) {
            type Value = $T;

            #[inline]
            fn slot(slots: &Self::Slots) -> &Mutex<$T> {
                &slots.$idx
            }
        }
    };
    (@at $all:tt $($idx:tt : $T:ident),+) => {
        $(field_tuple!(@one $all $idx : $T);)+
    };
    ($size:expr => $($idx:tt : $T:ident),+) => {
        impl<$($T: Clone + Send),+> private::Sealed for ($($T,)+) {}

        impl<$($T: Clone + Send),+> FieldTuple for ($($T,)+) {
            type Slots = ($(Mutex<$T>,)+);
            const SIZE: usize = $size;

            fn into_slots(self) -> Self::Slots {
                ($(Mutex::new(self.$idx),)+)
            }
        }

        field_tuple!(@at ($($T),+) $($idx : $T),+);
    };
}

field_tuple!(1 => 0: A);
field_tuple!(2 => 0: A, 1: B);
field_tuple!(3 => 0: A, 1: B, 2: C);
field_tuple!(4 => 0: A, 1: B, 2: C, 3: D);
field_tuple!(5 => 0: A, 1: B, 2: C, 3: D, 4: E);
field_tuple!(6 => 0: A, 1: B, 2: C, 3: D, 4: E, 5: F);
field_tuple!(7 => 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G);
field_tuple!(8 => 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H);
field_tuple!(9 => 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I);
field_tuple!(10 => 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I, 9: J);
field_tuple!(11 => 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I, 9: J, 10: K);
field_tuple!(12 => 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I, 9: J, 10: K, 11: L);

type Widest = ((), (), (), (), (), (), (), (), (), (), (), ());
static_assertions::const_assert_eq!(<Widest as FieldTuple>::SIZE, MAX_FIELDS);

/// Current value of every field, each behind its own lock.
///
/// Reads and writes never take more than one field lock and never block
/// beyond that lock's critical section.
pub struct FieldStore<R: FieldTuple> {
    slots: R::Slots,
}

impl<R: FieldTuple> FieldStore<R> {
    /// Create a store holding `initial`.
    pub fn new(initial: R) -> Self {
        Self {
            slots: initial.into_slots(),
        }
    }

    /// Number of fields.
    pub const fn field_count(&self) -> usize {
        R::SIZE
    }

    /// Copy of field `I`.
    #[inline]
    pub fn read<const I: usize>(&self) -> <R as FieldAt<I>>::Value
    where
        R: FieldAt<I>,
    {
        <R as FieldAt<I>>::slot(&self.slots).lock().clone()
    }

    /// Overwrite field `I`.
    #[inline]
    pub fn write<const I: usize>(&self, value: <R as FieldAt<I>>::Value)
    where
        R: FieldAt<I>,
    {
        *<R as FieldAt<I>>::slot(&self.slots).lock() = value;
    }

    /// Overwrite field `I`, returning the previous value.
    pub fn replace<const I: usize>(
        &self,
        value: <R as FieldAt<I>>::Value,
    ) -> <R as FieldAt<I>>::Value
    where
        R: FieldAt<I>,
    {
        std::mem::replace(&mut *<R as FieldAt<I>>::slot(&self.slots).lock(), value)
    }
}

impl<R: FieldTuple + Default> Default for FieldStore<R> {
    fn default() -> Self {
        Self::new(R::default())
    }
}
