//! Stand-in design-system primitives.
//!
//! Generated components reference shadcn-style names (`Button`, `Card`, ...)
//! that do not exist in the sandbox. The catalog provides one JSX renderer per
//! name so those references resolve. Every shim takes an open prop set plus
//! `children`, ignores props it does not model, and styles itself with Tailwind
//! utility classes. Visual approximation only.

use serde::Serialize;

/// Names the sandbox runtime itself binds. They are never entry candidates.
pub const RUNTIME_NAMES: &[&str] = &["React", "ReactDOM"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShimComponent {
    pub name: &'static str,
    /// Arrow-function JSX source; transpiled inside the sandbox.
    pub renderer: &'static str,
}

/// Immutable registry of shims. Built once and shared by reference into every
/// execution document.
#[derive(Debug, Clone)]
pub struct ShimCatalog {
    components: Vec<ShimComponent>,
}

impl ShimCatalog {
    pub fn standard() -> Self {
        let components = STANDARD_SHIMS
            .iter()
            .map(|&(name, renderer)| ShimComponent { name, renderer })
            .collect();
        Self { components }
    }

    /// A catalog of caller-supplied shims. Later duplicates of a name are dropped.
    pub fn from_components(components: impl IntoIterator<Item = ShimComponent>) -> Self {
        let mut unique: Vec<ShimComponent> = Vec::new();
        for component in components {
            if !unique.iter().any(|c| c.name == component.name) {
                unique.push(component);
            }
        }
        Self { components: unique }
    }

    pub fn get(&self, name: &str) -> Option<&ShimComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True for shim names and the runtime's own bindings.
    pub fn is_reserved(&self, name: &str) -> bool {
        RUNTIME_NAMES.contains(&name) || self.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.components.iter().map(|c| c.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShimComponent> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The whole catalog as one JSX prelude: `const Name = <renderer>;` per shim.
    pub fn to_prelude(&self) -> String {
        let mut out = String::new();
        for shim in &self.components {
            out.push_str("const ");
            out.push_str(shim.name);
            out.push_str(" = ");
            out.push_str(shim.renderer.trim());
            out.push_str(";\n");
        }
        out
    }
}

impl Default for ShimCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// Tabs state travels to its children through `__active` and `__select` props.
const STANDARD_SHIMS: &[(&str, &str)] = &[
    (
        "Button",
        r#"({ children, className = '', variant, size, asChild, ...props }) => {
  const tone = { outline: 'border border-gray-300 bg-white hover:bg-gray-50', ghost: 'hover:bg-gray-100', destructive: 'bg-red-600 text-white hover:bg-red-700', secondary: 'bg-gray-100 text-gray-900 hover:bg-gray-200', link: 'text-gray-900 underline-offset-4 hover:underline' }[variant] || 'bg-gray-900 text-white hover:bg-gray-800';
  const box = { sm: 'h-9 px-3', lg: 'h-11 px-8', icon: 'h-10 w-10' }[size] || 'h-10 px-4 py-2';
  return <button className={'inline-flex items-center justify-center rounded-md text-sm font-medium transition-colors disabled:pointer-events-none disabled:opacity-50 ' + tone + ' ' + box + ' ' + className} {...props}>{children}</button>;
}"#,
    ),
    (
        "Card",
        r#"({ children, className = '', ...props }) => (
  <div className={'rounded-lg border border-gray-200 bg-white text-gray-900 shadow-sm ' + className} {...props}>{children}</div>
)"#,
    ),
    (
        "CardHeader",
        r#"({ children, className = '', ...props }) => (
  <div className={'flex flex-col space-y-1.5 p-6 ' + className} {...props}>{children}</div>
)"#,
    ),
    (
        "CardTitle",
        r#"({ children, className = '', ...props }) => (
  <h3 className={'text-2xl font-semibold leading-none tracking-tight ' + className} {...props}>{children}</h3>
)"#,
    ),
    (
        "CardDescription",
        r#"({ children, className = '', ...props }) => (
  <p className={'text-sm text-gray-500 ' + className} {...props}>{children}</p>
)"#,
    ),
    (
        "CardContent",
        r#"({ children, className = '', ...props }) => (
  <div className={'p-6 pt-0 ' + className} {...props}>{children}</div>
)"#,
    ),
    (
        "CardFooter",
        r#"({ children, className = '', ...props }) => (
  <div className={'flex items-center p-6 pt-0 ' + className} {...props}>{children}</div>
)"#,
    ),
    (
        "Input",
        r#"({ className = '', type = 'text', ...props }) => (
  <input type={type} className={'flex h-10 w-full rounded-md border border-gray-300 bg-white px-3 py-2 text-sm placeholder:text-gray-400 focus:outline-none focus:ring-2 focus:ring-gray-400 disabled:opacity-50 ' + className} {...props} />
)"#,
    ),
    (
        "Textarea",
        r#"({ className = '', ...props }) => (
  <textarea className={'flex min-h-[80px] w-full rounded-md border border-gray-300 bg-white px-3 py-2 text-sm placeholder:text-gray-400 focus:outline-none focus:ring-2 focus:ring-gray-400 disabled:opacity-50 ' + className} {...props} />
)"#,
    ),
    (
        "Label",
        r#"({ children, className = '', ...props }) => (
  <label className={'text-sm font-medium leading-none ' + className} {...props}>{children}</label>
)"#,
    ),
    (
        "Select",
        r#"({ children, className = '', value, defaultValue, onValueChange, ...props }) => {
  const [current, setCurrent] = React.useState(value !== undefined ? value : defaultValue);
  React.useEffect(() => { if (value !== undefined) setCurrent(value); }, [value]);
  return (
    <select className={'flex h-10 w-full rounded-md border border-gray-300 bg-white px-3 py-2 text-sm ' + className} value={current} onChange={(e) => { setCurrent(e.target.value); if (onValueChange) onValueChange(e.target.value); }} {...props}>
      {children}
    </select>
  );
}"#,
    ),
    ("SelectTrigger", r#"({ children }) => <>{children}</>"#),
    ("SelectContent", r#"({ children }) => <>{children}</>"#),
    (
        "SelectItem",
        r#"({ children, value, ...props }) => <option value={value} {...props}>{children}</option>"#,
    ),
    ("SelectValue", r#"() => null"#),
    (
        "Checkbox",
        r#"({ className = '', checked, onCheckedChange, onChange, ...props }) => (
  <input type="checkbox" className={'h-4 w-4 rounded border-gray-400 ' + className} checked={checked} onChange={(e) => { if (onCheckedChange) onCheckedChange(e.target.checked); if (onChange) onChange(e); }} {...props} />
)"#,
    ),
    (
        "Switch",
        r#"({ className = '', checked, defaultChecked = false, onCheckedChange, ...props }) => {
  const [on, setOn] = React.useState(checked !== undefined ? checked : defaultChecked);
  React.useEffect(() => { if (checked !== undefined) setOn(checked); }, [checked]);
  const toggle = () => { setOn(!on); if (onCheckedChange) onCheckedChange(!on); };
  return (
    <button type="button" role="switch" aria-checked={on} onClick={toggle} className={'inline-flex h-6 w-11 items-center rounded-full transition-colors ' + (on ? 'bg-gray-900' : 'bg-gray-300') + ' ' + className} {...props}>
      <span className={'block h-5 w-5 rounded-full bg-white shadow transition-transform ' + (on ? 'translate-x-5' : 'translate-x-0.5')} />
    </button>
  );
}"#,
    ),
    (
        "Badge",
        r#"({ children, className = '', variant, ...props }) => {
  const tone = { outline: 'border-current', secondary: 'border-transparent bg-gray-100 text-gray-900', destructive: 'border-transparent bg-red-600 text-white' }[variant] || 'border-transparent bg-gray-900 text-white';
  return <div className={'inline-flex items-center rounded-full border px-2.5 py-0.5 text-xs font-semibold ' + tone + ' ' + className} {...props}>{children}</div>;
}"#,
    ),
    (
        "Separator",
        r#"({ className = '', orientation = 'horizontal', ...props }) => (
  <div className={'shrink-0 bg-gray-200 ' + (orientation === 'vertical' ? 'h-full w-[1px]' : 'h-[1px] w-full') + ' ' + className} {...props} />
)"#,
    ),
    (
        "Tabs",
        r#"({ children, defaultValue, value, onValueChange, className = '', ...props }) => {
  const [active, setActive] = React.useState(value !== undefined ? value : defaultValue);
  const select = (next) => { setActive(next); if (onValueChange) onValueChange(next); };
  return (
    <div className={className} {...props}>
      {React.Children.map(children, (child) => React.isValidElement(child) ? React.cloneElement(child, { __active: active, __select: select }) : child)}
    </div>
  );
}"#,
    ),
    (
        "TabsList",
        r#"({ children, className = '', __active, __select, ...props }) => (
  <div className={'inline-flex h-10 items-center justify-center rounded-md bg-gray-100 p-1 text-gray-500 ' + className} {...props}>
    {React.Children.map(children, (child) => React.isValidElement(child) ? React.cloneElement(child, { __active, __select }) : child)}
  </div>
)"#,
    ),
    (
        "TabsTrigger",
        r#"({ children, value, className = '', __active, __select, ...props }) => (
  <button type="button" onClick={() => __select && __select(value)} className={'inline-flex items-center justify-center whitespace-nowrap rounded-sm px-3 py-1.5 text-sm font-medium transition-all ' + (__active === value ? 'bg-white text-gray-900 shadow-sm' : '') + ' ' + className} {...props}>{children}</button>
)"#,
    ),
    (
        "TabsContent",
        r#"({ children, value, className = '', __active, __select, ...props }) => (
  __active === value ? <div className={'mt-2 ' + className} {...props}>{children}</div> : null
)"#,
    ),
    (
        "Progress",
        r#"({ value = 0, className = '', ...props }) => (
  <div className={'relative h-4 w-full overflow-hidden rounded-full bg-gray-100 ' + className} {...props}>
    <div className="h-full bg-gray-900 transition-all" style={{ width: Math.max(0, Math.min(100, value || 0)) + '%' }} />
  </div>
)"#,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_primitive_kinds() {
        let catalog = ShimCatalog::standard();
        for name in [
            "Button", "Card", "Label", "Input", "Select", "Switch", "Badge", "Separator", "Tabs",
        ] {
            assert!(catalog.contains(name), "missing shim {}", name);
        }
    }

    #[test]
    fn test_names_are_capitalized_and_unique() {
        let catalog = ShimCatalog::standard();
        let mut seen = std::collections::HashSet::new();
        for name in catalog.names() {
            assert!(name.starts_with(|c: char| c.is_ascii_uppercase()));
            assert!(seen.insert(name), "duplicate shim {}", name);
        }
    }

    #[test]
    fn test_runtime_names_are_reserved() {
        let catalog = ShimCatalog::standard();
        assert!(catalog.is_reserved("React"));
        assert!(catalog.is_reserved("ReactDOM"));
        assert!(catalog.is_reserved("CardTitle"));
        assert!(!catalog.is_reserved("Dashboard"));
    }

    #[test]
    fn test_custom_catalog_keeps_first_of_each_name() {
        let catalog = ShimCatalog::from_components([
            ShimComponent { name: "Badge", renderer: "(p) => p.children" },
            ShimComponent { name: "Badge", renderer: "() => null" },
            ShimComponent { name: "Chip", renderer: "() => null" },
        ]);
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Badge", "Chip"]);
        assert_eq!(catalog.get("Badge").map(|c| c.renderer), Some("(p) => p.children"));
        assert!(catalog.is_reserved("React"));
    }

    #[test]
    fn test_prelude_declares_every_shim() {
        let catalog = ShimCatalog::standard();
        let prelude = catalog.to_prelude();
        for name in catalog.names() {
            assert!(prelude.contains(&format!("const {} = ", name)));
        }
    }
}
