//! Database migrations for the type catalog tables

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_type_catalog::Migration),
            Box::new(m20250301_000002_create_datasources::Migration),
            Box::new(m20250301_000003_create_links::Migration),
        ]
    }
}

mod m20250301_000001_create_type_catalog {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_type_catalog"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BusinessDomain::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(BusinessDomain::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(BusinessDomain::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(BusinessDomain::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ObjectType::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ObjectType::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(ObjectType::Name).string().not_null().unique_key())
                        .col(ColumnDef::new(ObjectType::DomainId).uuid())
                        .col(ColumnDef::new(ObjectType::PrimaryKeyFieldName).string())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Property::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Property::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Property::ObjectTypeId).uuid().not_null())
                        .col(ColumnDef::new(Property::Name).string().not_null())
                        .col(ColumnDef::new(Property::DataType).string().not_null())
                        .col(
                            ColumnDef::new(Property::Required)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Property::DefaultValue).string())
                        .col(
                            ColumnDef::new(Property::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_property_object_type")
                                .from(Property::Table, Property::ObjectTypeId)
                                .to(ObjectType::Table, ObjectType::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uk_property_object_type_name")
                        .table(Property::Table)
                        .col(Property::ObjectTypeId)
                        .col(Property::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Property::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ObjectType::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BusinessDomain::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BusinessDomain {
        Table,
        Id,
        Code,
        Name,
    }

    #[derive(DeriveIden)]
    enum ObjectType {
        Table,
        Id,
        Name,
        DomainId,
        PrimaryKeyFieldName,
    }

    #[derive(DeriveIden)]
    enum Property {
        Table,
        Id,
        ObjectTypeId,
        Name,
        DataType,
        Required,
        DefaultValue,
        SortOrder,
    }
}

mod m20250301_000002_create_datasources {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_datasources"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Datasource::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Datasource::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Datasource::Code).string().not_null().unique_key())
                        .col(ColumnDef::new(Datasource::Name).string().not_null())
                        .col(ColumnDef::new(Datasource::Dialect).string().not_null())
                        .col(ColumnDef::new(Datasource::Host).string())
                        .col(ColumnDef::new(Datasource::Port).integer())
                        .col(ColumnDef::new(Datasource::DatabaseName).string())
                        .col(ColumnDef::new(Datasource::SchemaName).string())
                        .col(ColumnDef::new(Datasource::Username).string())
                        .col(ColumnDef::new(Datasource::Password).text())
                        .col(ColumnDef::new(Datasource::ConnectionUrl).text())
                        .col(
                            ColumnDef::new(Datasource::Enabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Datasource::Status).string())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ObjectTypeDatasource::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ObjectTypeDatasource::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ObjectTypeDatasource::ObjectTypeId).uuid().not_null())
                        .col(ColumnDef::new(ObjectTypeDatasource::DatasourceId).uuid().not_null())
                        .col(ColumnDef::new(ObjectTypeDatasource::TableName).string())
                        .col(ColumnDef::new(ObjectTypeDatasource::SchemaName).string())
                        .col(
                            ColumnDef::new(ObjectTypeDatasource::IsStorage)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ObjectTypeDatasource::IsDefault)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ObjectTypeDatasource::Priority)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_object_type_datasource_datasource")
                                .from(ObjectTypeDatasource::Table, ObjectTypeDatasource::DatasourceId)
                                .to(Datasource::Table, Datasource::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_object_type_datasource_object_type_id")
                        .table(ObjectTypeDatasource::Table)
                        .col(ObjectTypeDatasource::ObjectTypeId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ObjectTypeDatasource::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Datasource::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Datasource {
        Table,
        Id,
        Code,
        Name,
        Dialect,
        Host,
        Port,
        DatabaseName,
        SchemaName,
        Username,
        Password,
        ConnectionUrl,
        Enabled,
        Status,
    }

    #[derive(DeriveIden)]
    enum ObjectTypeDatasource {
        Table,
        Id,
        ObjectTypeId,
        DatasourceId,
        TableName,
        SchemaName,
        IsStorage,
        IsDefault,
        Priority,
    }
}

mod m20250301_000003_create_links {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_links"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LinkType::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(LinkType::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(LinkType::Name).string().not_null().unique_key())
                        .col(ColumnDef::new(LinkType::SourceObjectTypeId).uuid().not_null())
                        .col(ColumnDef::new(LinkType::TargetObjectTypeId).uuid().not_null())
                        .col(ColumnDef::new(LinkType::Cardinality).string().not_null())
                        .col(
                            ColumnDef::new(LinkType::Bidirectional)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LinkInstance::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(LinkInstance::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(LinkInstance::LinkTypeId).uuid().not_null())
                        .col(ColumnDef::new(LinkInstance::SourceInstanceId).uuid().not_null())
                        .col(ColumnDef::new(LinkInstance::TargetInstanceId).uuid().not_null())
                        .col(ColumnDef::new(LinkInstance::Properties).json())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_link_instance_link_type")
                                .from(LinkInstance::Table, LinkInstance::LinkTypeId)
                                .to(LinkType::Table, LinkType::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, column) in [
                ("idx_link_instance_source", LinkInstance::SourceInstanceId),
                ("idx_link_instance_target", LinkInstance::TargetInstanceId),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .name(name)
                            .table(LinkInstance::Table)
                            .col(column)
                            .to_owned(),
                    )
                    .await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LinkInstance::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LinkType::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum LinkType {
        Table,
        Id,
        Name,
        SourceObjectTypeId,
        TargetObjectTypeId,
        Cardinality,
        Bidirectional,
    }

    #[derive(DeriveIden)]
    enum LinkInstance {
        Table,
        Id,
        LinkTypeId,
        SourceInstanceId,
        TargetInstanceId,
        Properties,
    }
}
