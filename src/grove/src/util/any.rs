use std::any::{self, Any};
use std::ops::Deref;

/// Upcasting helpers for trait objects whose traits have [`Any`] as a
/// supertrait.
///
/// Method calls on a `Box<dyn Trait>` resolve to the box itself, so always go
/// through a dereference (`(*boxed).as_any()`) or through [`DowncastRef`] /
/// [`Downcast`], which take care of it.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    #[inline]
    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}

pub trait DowncastRef {
    fn is<T: Any>(&self) -> bool;

    fn downcast_ref<T: Any>(&self) -> Option<&T>;
}

impl<S> DowncastRef for S
where
    S: Deref<Target: AsAny>,
{
    #[inline]
    fn is<T: Any>(&self) -> bool {
        (**self).as_any().is::<T>()
    }

    #[inline]
    fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (**self).as_any().downcast_ref::<T>()
    }
}

pub trait Downcast: DowncastRef + Sized {
    type Output<T>;

    fn downcast<T: Any>(self) -> Result<Self::Output<T>, Self>;
}

impl<S> Downcast for Box<S>
where
    S: AsAny + ?Sized,
{
    type Output<T> = Box<T>;

    fn downcast<T: Any>(self) -> Result<Self::Output<T>, Self> {
        if self.is::<T>() {
            let res = self
                .into_any()
                .downcast::<T>()
                .unwrap_or_else(|_| unreachable!("`self` should be `Box<T>`"));
            Ok(res)
        } else {
            Err(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::managed::{Managed, SharedManaged};

    use super::*;

    #[test]
    fn downcast_succeeds_when_managed_object_is_boxed() {
        let object: Box<dyn Managed> = Box::new(String::from("grove"));

        assert!(object.is::<String>());
        assert!(!object.is::<Box<dyn Managed>>());
        assert_eq!(object.downcast_ref::<String>().map(String::as_str), Some("grove"));

        let Ok(object) = object.downcast::<String>() else {
            panic!("the object should be a `String`");
        };
        assert_eq!(*object, "grove");
    }

    #[test]
    fn downcast_fails_when_type_differs() {
        let object: Box<dyn Managed> = Box::new(42u32);
        let object = object.downcast::<i64>().unwrap_err();
        assert_eq!(object.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn type_name_reports_erased_type() {
        let shared: Box<dyn SharedManaged> = Box::new(Arc::new(7u8));
        assert_eq!((*shared).type_name(), any::type_name::<Arc<u8>>());
    }
}
