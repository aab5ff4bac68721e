/// Query-language AST, one piece per clause

/// `[table.]field`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub table: Option<String>,
    pub field: String,
}

impl FieldRef {
    #[must_use]
    pub fn new(table: Option<&str>, field: &str) -> Self {
        Self {
            table: table.map(str::to_string),
            field: field.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Integer(i64),
    Real(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(FieldRef),
    Literal(Literal),
    /// Function call; `distinct` for COUNT(DISTINCT x)
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },
    /// `*` inside COUNT(*)
    Star,
    Binary {
        left: Box<Expr>,
        op: ArithOp,
        right: Box<Expr>,
    },
    Nested(Box<Expr>),
}

impl Expr {
    #[must_use]
    pub const fn as_field(&self) -> Option<&FieldRef> {
        match self {
            Self::Field(f) => Some(f),
            _ => None,
        }
    }

    /// Whether an aggregate function appears anywhere in the expression
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Function { name, args, .. } => {
                crate::query::functions::is_aggregate(name)
                    || args.iter().any(Self::contains_aggregate)
            }
            Self::Binary { left, right, .. } => left.contains_aggregate() || right.contains_aggregate(),
            Self::Nested(inner) => inner.contains_aggregate(),
            Self::Field(_) | Self::Literal(_) | Self::Star => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl CompareOp {
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Self::Eq),
            "<>" | "!=" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            ">" => Some(Self::Gt),
            "<=" => Some(Self::LtEq),
            ">=" => Some(Self::GtEq),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Kilometers,
    Miles,
}

impl DistanceUnit {
    #[must_use]
    pub const fn to_kilometers(self, distance: f64) -> f64 {
        match self {
            Self::Kilometers => distance,
            Self::Miles => distance * 1.609_344,
        }
    }
}

/// WHERE / HAVING predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        left: Expr,
        op: CompareOp,
        right: Expr,
    },
    Like {
        expr: Expr,
        pattern: Expr,
        negated: bool,
    },
    /// List membership
    Holds {
        field: FieldRef,
        value: Expr,
    },
    HoldsLike {
        field: FieldRef,
        pattern: Expr,
    },
    /// Coordinates within `distance` of (lat, lon)
    Near {
        field: FieldRef,
        lat: f64,
        lon: f64,
        distance: f64,
        unit: DistanceUnit,
    },
    /// Hierarchy containment
    Within {
        field: FieldRef,
        value: Expr,
    },
    IsNull {
        expr: Expr,
        negated: bool,
    },
    In {
        expr: Expr,
        values: Vec<Expr>,
        negated: bool,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Whether HOLDS, NEAR or WITHIN appears anywhere in the tree
    #[must_use]
    pub fn uses_cargo_operator(&self) -> bool {
        match self {
            Self::Holds { .. } | Self::HoldsLike { .. } | Self::Near { .. } | Self::Within { .. } => true,
            Self::And(a, b) | Self::Or(a, b) => a.uses_cargo_operator() || b.uses_cargo_operator(),
            Self::Not(inner) => inner.uses_cargo_operator(),
            Self::Compare { .. } | Self::Like { .. } | Self::IsNull { .. } | Self::In { .. } => false,
        }
    }
}

/// Entry of the `tables` clause: `name[=alias]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

/// Entry of the `fields` clause: `expression[=alias]`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectField {
    pub expr: Expr,
    pub alias: Option<String>,
    /// Source text of the expression, used as the default alias
    pub text: String,
}

/// Entry of the `join on` clause: `A.x = B.y` or `A.list HOLDS B.y`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    pub left: FieldRef,
    pub right: FieldRef,
    pub holds: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub order: SortOrder,
}
