//! Metadata queries issued through the backend's "run query" call.
//!
//! Every query starts with a `-- facet: <name>` marker so offline backends can
//! answer by facet without parsing SQL. Each facet is one round trip covering
//! all non-system schemas.

/// Schemas never included in the catalog.
pub const SYSTEM_SCHEMAS: &str =
    "('information_schema', 'pg_catalog', 'pg_toast', 'auth', 'storage', 'realtime', 'extensions', 'graphql', 'graphql_public', 'vault', 'pgsodium', 'supabase_functions', 'supabase_migrations', 'net', 'cron')";

pub const PING: &str = "-- facet: ping\nselect 1 as ok";

pub const TABLES: &str = "-- facet: tables
select t.table_schema, t.table_name
from information_schema.tables t
where t.table_type = 'BASE TABLE'
  and t.table_schema not in {SYSTEM}
order by t.table_schema, t.table_name";

pub const COLUMNS: &str = "-- facet: columns
select c.table_schema, c.table_name, c.column_name, c.data_type, c.udt_name,
       (c.is_nullable = 'YES') as is_nullable, c.column_default, c.ordinal_position
from information_schema.columns c
where c.table_schema not in {SYSTEM}
order by c.table_schema, c.table_name, c.ordinal_position";

pub const PRIMARY_KEYS: &str = "-- facet: primary_keys
select tc.table_schema, tc.table_name, kcu.column_name
from information_schema.table_constraints tc
join information_schema.key_column_usage kcu
  on tc.constraint_name = kcu.constraint_name and tc.table_schema = kcu.table_schema
where tc.constraint_type = 'PRIMARY KEY'
  and tc.table_schema not in {SYSTEM}
order by tc.table_schema, tc.table_name, kcu.ordinal_position";

pub const FOREIGN_KEYS: &str = "-- facet: foreign_keys
select tc.table_schema, tc.table_name, kcu.column_name, tc.constraint_name,
       ccu.table_schema as foreign_schema, ccu.table_name as foreign_table,
       ccu.column_name as foreign_column
from information_schema.table_constraints tc
join information_schema.key_column_usage kcu
  on tc.constraint_name = kcu.constraint_name and tc.table_schema = kcu.table_schema
join information_schema.constraint_column_usage ccu
  on ccu.constraint_name = tc.constraint_name
where tc.constraint_type = 'FOREIGN KEY'
  and tc.table_schema not in {SYSTEM}";

pub const INDEXES: &str = "-- facet: indexes
select i.schemaname as table_schema, i.tablename as table_name, i.indexname as index_name,
       i.indexdef as definition, (i.indexdef ilike 'create unique%') as is_unique
from pg_indexes i
where i.schemaname not in {SYSTEM}";

pub const RLS: &str = "-- facet: rls
select n.nspname as table_schema, c.relname as table_name,
       c.relrowsecurity as rls_enabled, c.reltuples::bigint as row_estimate
from pg_class c
join pg_namespace n on n.oid = c.relnamespace
where c.relkind = 'r' and n.nspname not in {SYSTEM}";

pub const POLICIES: &str = "-- facet: policies
select p.schemaname as table_schema, p.tablename as table_name, p.policyname as policy_name,
       p.cmd as command, p.roles, (p.permissive = 'PERMISSIVE') as permissive,
       p.qual as using_expr, p.with_check as check_expr
from pg_policies p
where p.schemaname not in {SYSTEM}";

pub const FUNCTIONS: &str = "-- facet: functions
select r.routine_schema, r.routine_name, r.specific_name, r.data_type as return_type,
       r.external_language as language, (r.security_type = 'DEFINER') as security_definer,
       obj_description(p.oid, 'pg_proc') as description
from information_schema.routines r
left join pg_proc p on p.proname = r.routine_name
left join pg_namespace n on n.oid = p.pronamespace and n.nspname = r.routine_schema
where r.routine_type = 'FUNCTION'
  and r.routine_schema not in {SYSTEM}
order by r.routine_schema, r.routine_name";

pub const FUNCTION_PARAMS: &str = "-- facet: function_params
select p.specific_schema as routine_schema, p.specific_name, p.parameter_name,
       coalesce(p.udt_name, p.data_type) as pg_type, p.parameter_mode,
       p.ordinal_position, p.parameter_default
from information_schema.parameters p
where p.specific_schema not in {SYSTEM}
order by p.specific_schema, p.specific_name, p.ordinal_position";

pub const ENUMS: &str = "-- facet: enums
select n.nspname as enum_schema, t.typname as enum_name,
       array_agg(e.enumlabel order by e.enumsortorder) as enum_values
from pg_type t
join pg_enum e on e.enumtypid = t.oid
join pg_namespace n on n.oid = t.typnamespace
where n.nspname not in {SYSTEM}
group by n.nspname, t.typname";

pub const VIEWS: &str = "-- facet: views
select v.table_schema, v.table_name, v.view_definition
from information_schema.views v
where v.table_schema not in {SYSTEM}";

pub const EXTENSIONS: &str = "-- facet: extensions
select extname from pg_extension order by extname";

pub const SCHEMAS: &str = "-- facet: schemas
select schema_name from information_schema.schemata
where schema_name not in {SYSTEM}
order by schema_name";

/// Render a query template, substituting the system-schema list.
pub fn render(template: &str) -> String {
    template.replace("{SYSTEM}", SYSTEM_SCHEMAS)
}

/// Extract the facet marker from a rendered query.
pub fn facet_of(sql: &str) -> Option<&str> {
    sql.lines()
        .next()
        .and_then(|l| l.strip_prefix("-- facet:"))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_system_schemas() {
        let sql = render(TABLES);
        assert!(sql.contains("'pg_catalog'"));
        assert!(!sql.contains("{SYSTEM}"));
    }

    #[test]
    fn test_facet_marker() {
        assert_eq!(facet_of(&render(FUNCTION_PARAMS)), Some("function_params"));
        assert_eq!(facet_of(PING), Some("ping"));
        assert_eq!(facet_of("select 1"), None);
    }
}
