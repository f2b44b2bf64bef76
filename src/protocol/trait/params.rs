use crate::error::Result;
use crate::protocol::r#trait::param::Param;
use crate::protocol::value::{NullBitmap, set_parameter_null};

/// Trait for parameter binding in prepared statements
///
/// The implementation is responsible for encoding parameters according to the MySQL binary
/// protocol.
pub trait Params {
    /// Number of parameters
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether parameter `idx` is NULL
    fn is_null(&self, idx: usize) -> bool;

    /// Write NULL bitmap
    ///
    /// The NULL bitmap is (num_params + 7) / 8 bytes long.
    /// Bit is set to 1 if the parameter is NULL.
    fn write_null_bitmap(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.resize(start + NullBitmap::parameters_len(self.len()), 0);
        for idx in 0..self.len() {
            if self.is_null(idx) {
                set_parameter_null(&mut out[start..], idx);
            }
        }
    }

    /// Write parameter types, 2 bytes each: MYSQL_TYPE_* and the unsigned flag (0x80)
    fn write_types(&self, out: &mut Vec<u8>);

    /// Write the values of the non-NULL parameters
    fn write_values(&self, out: &mut Vec<u8>) -> Result<()>;
}

/// Empty parameters (no parameters)
impl Params for () {
    fn len(&self) -> usize {
        0
    }

    fn is_null(&self, _idx: usize) -> bool {
        false
    }

    fn write_types(&self, _out: &mut Vec<u8>) {}

    fn write_values(&self, _out: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }
}

impl<T: Param> Params for [T] {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn is_null(&self, idx: usize) -> bool {
        self.get(idx).is_some_and(|param| param.is_null())
    }

    fn write_types(&self, out: &mut Vec<u8>) {
        for param in self {
            param.encode_type(out);
        }
    }

    fn write_values(&self, out: &mut Vec<u8>) -> Result<()> {
        for param in self {
            if !param.is_null() {
                param.encode_value(out)?;
            }
        }
        Ok(())
    }
}

impl<T: Param> Params for Vec<T> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn is_null(&self, idx: usize) -> bool {
        Params::is_null(self.as_slice(), idx)
    }

    fn write_types(&self, out: &mut Vec<u8>) {
        self.as_slice().write_types(out)
    }

    fn write_values(&self, out: &mut Vec<u8>) -> Result<()> {
        self.as_slice().write_values(out)
    }
}

impl<T: Param, const N: usize> Params for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn is_null(&self, idx: usize) -> bool {
        Params::is_null(self.as_slice(), idx)
    }

    fn write_types(&self, out: &mut Vec<u8>) {
        self.as_slice().write_types(out)
    }

    fn write_values(&self, out: &mut Vec<u8>) -> Result<()> {
        self.as_slice().write_values(out)
    }
}

impl<P: Params + ?Sized> Params for &P {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_null(&self, idx: usize) -> bool {
        (**self).is_null(idx)
    }

    fn write_types(&self, out: &mut Vec<u8>) {
        (**self).write_types(out)
    }

    fn write_values(&self, out: &mut Vec<u8>) -> Result<()> {
        (**self).write_values(out)
    }
}

macro_rules! impl_params_for_tuple {
    ($len:expr; $($idx:tt: $T:ident),+) => {
        impl<$($T: Param),+> Params for ($($T,)+) {
            fn len(&self) -> usize {
                $len
            }

            fn is_null(&self, idx: usize) -> bool {
                match idx {
                    $($idx => self.$idx.is_null(),)+
                    _ => false,
                }
            }

            fn write_types(&self, out: &mut Vec<u8>) {
                $(self.$idx.encode_type(out);)+
            }

            fn write_values(&self, out: &mut Vec<u8>) -> Result<()> {
                $(
                    if !self.$idx.is_null() {
                        self.$idx.encode_value(out)?;
                    }
                )+
                Ok(())
            }
        }
    };
}

impl_params_for_tuple!(1; 0: A);
impl_params_for_tuple!(2; 0: A, 1: B);
impl_params_for_tuple!(3; 0: A, 1: B, 2: C);
impl_params_for_tuple!(4; 0: A, 1: B, 2: C, 3: D);
impl_params_for_tuple!(5; 0: A, 1: B, 2: C, 3: D, 4: E);
impl_params_for_tuple!(6; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F);
impl_params_for_tuple!(7; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G);
impl_params_for_tuple!(8; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H);
