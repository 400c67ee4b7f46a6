use std::fmt;

/// A gradual type. `Any` is assignable in both directions; everything else
/// is compared nominally.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Any,
    Number,
    String,
    Boolean,
    Void,
    Null,
    /// A class, interface, enum, or imported nominal type.
    Named(String),
    Array(Box<Type>),
    Function(Box<FunctionType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<(String, Type)>,
    pub ret: Type,
    pub is_async: bool,
}

impl Type {
    pub fn function(params: Vec<(String, Type)>, ret: Type, is_async: bool) -> Type {
        Type::Function(Box::new(FunctionType {
            params,
            ret,
            is_async,
        }))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Number | Type::Any)
    }
}

/// Whether a value of type `from` may flow into a slot of type `to`.
pub fn assignable(from: &Type, to: &Type) -> bool {
    match (from, to) {
        (Type::Any, _) | (_, Type::Any) => true,
        (Type::Null, _) => true,
        (Type::Array(from), Type::Array(to)) => assignable(from, to),
        (Type::Function(from), Type::Function(to)) => {
            from.params.len() == to.params.len()
                && from
                    .params
                    .iter()
                    .zip(&to.params)
                    .all(|((_, f), (_, t))| assignable(t, f))
                && assignable(&from.ret, &to.ret)
        }
        _ => from == to,
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("any"),
            Type::Number => f.write_str("number"),
            Type::String => f.write_str("string"),
            Type::Boolean => f.write_str("boolean"),
            Type::Void => f.write_str("void"),
            Type::Null => f.write_str("null"),
            Type::Named(name) => f.write_str(name),
            Type::Array(element) => write!(f, "{element}[]"),
            Type::Function(function) => {
                f.write_str("(")?;
                for (i, (name, ty)) in function.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, ") => {}", function.ret)
            }
        }
    }
}

/// The member table of a nominal type, used for property lookup and for
/// printing class signatures.
#[derive(Debug, Clone)]
pub enum Shape {
    Class(ClassShape),
    Interface(ClassShape),
    Enum(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct ClassShape {
    pub extends: Option<String>,
    pub fields: Vec<(String, Type)>,
    pub methods: Vec<(String, FunctionType)>,
}

impl ClassShape {
    pub fn member_type(&self, name: &str) -> Option<Type> {
        if let Some((_, ty)) = self.fields.iter().find(|(field, _)| field == name) {
            return Some(ty.clone());
        }
        self.methods
            .iter()
            .find(|(method, _)| method == name)
            .map(|(_, signature)| Type::Function(Box::new(signature.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_is_assignable_both_ways() {
        assert!(assignable(&Type::Any, &Type::Number));
        assert!(assignable(&Type::Number, &Type::Any));
    }

    #[test]
    fn nominal_types_compare_by_name() {
        assert!(assignable(
            &Type::Named("Foo".into()),
            &Type::Named("Foo".into())
        ));
        assert!(!assignable(
            &Type::Named("Foo".into()),
            &Type::Named("Bar".into())
        ));
    }

    #[test]
    fn display_round_trips_builtin_names() {
        assert_eq!(Type::Number.to_string(), "number");
        assert_eq!(Type::Array(Box::new(Type::String)).to_string(), "string[]");
        assert_eq!(
            Type::function(vec![("a".into(), Type::Number)], Type::Void, false).to_string(),
            "(a: number) => void"
        );
    }
}
