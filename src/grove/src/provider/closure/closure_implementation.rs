use std::error::Error;

use crate::key::{self, Key};
use crate::managed::Managed;
use crate::provider::closure::Closure;
use crate::resolver::{ResolveError, Resolver, TypedResolver};

impl<F, T, E> Closure<()> for F
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
    T: Managed,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    type Constructed = T;

    type Error = E;

    fn run(
        &self,
        _resolver: &dyn Resolver,
    ) -> Result<Result<Self::Constructed, Self::Error>, ResolveError> {
        Ok(self())
    }

    fn dependencies(&self) -> Vec<Box<dyn Key>> {
        Vec::new()
    }
}

macro_rules! for_all_tuples {
    ($implementation:ident) => {
        $implementation!(D1);
        $implementation!(D1, D2);
        $implementation!(D1, D2, D3);
        $implementation!(D1, D2, D3, D4);
        $implementation!(D1, D2, D3, D4, D5);
        $implementation!(D1, D2, D3, D4, D5, D6);
        $implementation!(D1, D2, D3, D4, D5, D6, D7);
        $implementation!(D1, D2, D3, D4, D5, D6, D7, D8);
        $implementation!(D1, D2, D3, D4, D5, D6, D7, D8, D9);
        $implementation!(D1, D2, D3, D4, D5, D6, D7, D8, D9, D10);
        $implementation!(D1, D2, D3, D4, D5, D6, D7, D8, D9, D10, D11);
        $implementation!(D1, D2, D3, D4, D5, D6, D7, D8, D9, D10, D11, D12);
    };
}

macro_rules! impl_closure {
    ($($dep:ident),*) => {
        #[allow(non_snake_case)]
        impl<F, T, E, $($dep,)*> Closure<($($dep,)*)> for F
        where
            F: Fn($($dep,)*) -> Result<T, E> + Send + Sync + 'static,
            T: Managed,
            E: Into<Box<dyn Error + Send + Sync>>,
            $($dep: Managed,)*
        {
            type Constructed = T;

            type Error = E;

            fn run(
                &self,
                resolver: &dyn Resolver,
            ) -> Result<Result<Self::Constructed, Self::Error>, ResolveError> {
                $(
                    let $dep = resolver.resolve(key::of::<$dep>())?;
                )*
                Ok(self($($dep,)*))
            }

            fn dependencies(&self) -> Vec<Box<dyn Key>> {
                vec![$(Box::new(key::of::<$dep>()),)*]
            }
        }
    };
}

for_all_tuples!(impl_closure);
