use std::any::Any;
use std::fmt;

use crate::TypeKey;

type Binder<T> = Box<dyn Fn(&mut T, Box<dyn Any>) -> Result<(), Box<dyn Any>> + Send + Sync>;

/// A named, typed slot on an injection target.
///
/// The declared type of the slot is the lookup key used by the injector.
///
/// # Examples
///
/// ```rust
/// use ferrule::Attribute;
///
/// #[derive(Default)]
/// struct Screen {
///     title: Option<String>,
///     retries: u32,
/// }
///
/// let title = Attribute::optional("title", |screen: &mut Screen| &mut screen.title);
/// let retries = Attribute::new("retries", |screen: &mut Screen| &mut screen.retries);
///
/// let mut screen = Screen::default();
/// assert!(title.bind(&mut screen, Box::new("Inbox".to_string())));
/// assert!(!retries.bind(&mut screen, Box::new("three")));
/// assert_eq!(screen.title.as_deref(), Some("Inbox"));
/// assert_eq!(screen.retries, 0);
/// ```
pub struct Attribute<T> {
    name: &'static str,
    key: TypeKey,
    binder: Binder<T>,
}

impl<T> Attribute<T>
where
    T: 'static,
{
    /// Describes a slot of type `V`, overwritten on injection.
    pub fn new<V>(name: &'static str, slot: fn(&mut T) -> &mut V) -> Self
    where
        V: 'static,
    {
        Self {
            name,
            key: TypeKey::of::<V>(),
            binder: Box::new(move |target: &mut T, value: Box<dyn Any>| {
                *slot(target) = *value.downcast::<V>()?;
                Ok(())
            }),
        }
    }

    /// Describes a slot of type `Option<V>`, set to `Some` on injection.
    pub fn optional<V>(name: &'static str, slot: fn(&mut T) -> &mut Option<V>) -> Self
    where
        V: 'static,
    {
        Self {
            name,
            key: TypeKey::of::<V>(),
            binder: Box::new(move |target: &mut T, value: Box<dyn Any>| {
                *slot(target) = Some(*value.downcast::<V>()?);
                Ok(())
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared type of the slot.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Writes `value` into the slot.
    ///
    /// Returns `false` and leaves `target` unchanged when `value` is not of
    /// the declared type.
    pub fn bind(&self, target: &mut T, value: Box<dyn Any>) -> bool {
        (self.binder)(target, value).is_ok()
    }
}

impl<T> fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish()
    }
}

/// Writes `value` into `attribute` of `target`, see [`Attribute::bind`].
pub fn bind<T>(target: &mut T, attribute: &Attribute<T>, value: Box<dyn Any>) -> bool
where
    T: 'static,
{
    attribute.bind(target, value)
}

/// Types whose attributes can be populated by an injector.
///
/// Usually derived with `#[derive(Inject)]`, marking slots with `#[inject]`.
pub trait Injectable: Sized + 'static {
    fn attributes() -> Vec<Attribute<Self>>;
}
