//! SeaORM entities for the type catalog tables

/// Business domain table entity
pub mod business_domain {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "business_domain")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        /// Prefix of every instance table in the domain
        #[sea_orm(unique)]
        pub code: String,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::object_type::Entity")]
        ObjectType,
    }

    impl Related<super::object_type::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::ObjectType.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Object type table entity
pub mod object_type {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "object_type")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(unique)]
        pub name: String,
        pub domain_id: Option<Uuid>,
        pub primary_key_field_name: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::business_domain::Entity",
            from = "Column::DomainId",
            to = "super::business_domain::Column::Id"
        )]
        BusinessDomain,
        #[sea_orm(has_many = "super::property::Entity")]
        Property,
    }

    impl Related<super::business_domain::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::BusinessDomain.def()
        }
    }

    impl Related<super::property::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Property.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Property table entity
pub mod property {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "property")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub object_type_id: Uuid,
        pub name: String,
        /// Generic type name, e.g. `STRING`, `INTEGER`
        pub data_type: String,
        pub required: bool,
        pub default_value: Option<String>,
        pub sort_order: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::object_type::Entity",
            from = "Column::ObjectTypeId",
            to = "super::object_type::Column::Id"
        )]
        ObjectType,
    }

    impl Related<super::object_type::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::ObjectType.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Datasource table entity
pub mod datasource {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "datasource")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(unique)]
        pub code: String,
        pub name: String,
        pub dialect: String,
        pub host: Option<String>,
        pub port: Option<i32>,
        pub database_name: Option<String>,
        pub schema_name: Option<String>,
        pub username: Option<String>,
        /// Stored secret, `ENC:` prefixed when encrypted
        pub password: Option<String>,
        pub connection_url: Option<String>,
        pub enabled: bool,
        pub status: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Object type to datasource binding table entity
pub mod storage_binding {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "object_type_datasource")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub object_type_id: Uuid,
        pub datasource_id: Uuid,
        pub table_name: Option<String>,
        pub schema_name: Option<String>,
        pub is_storage: bool,
        pub is_default: bool,
        pub priority: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::datasource::Entity",
            from = "Column::DatasourceId",
            to = "super::datasource::Column::Id"
        )]
        Datasource,
    }

    impl Related<super::datasource::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Datasource.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Link type table entity
pub mod link_type {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "link_type")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(unique)]
        pub name: String,
        pub source_object_type_id: Uuid,
        pub target_object_type_id: Uuid,
        pub cardinality: String,
        pub bidirectional: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Link instance table entity
pub mod link_instance {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "link_instance")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub link_type_id: Uuid,
        pub source_instance_id: Uuid,
        pub target_instance_id: Uuid,
        /// Edge attributes
        pub properties: Option<Json>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::link_type::Entity",
            from = "Column::LinkTypeId",
            to = "super::link_type::Column::Id"
        )]
        LinkType,
    }

    impl Related<super::link_type::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::LinkType.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
